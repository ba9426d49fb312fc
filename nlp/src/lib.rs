// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Nonlinear programming models over external evaluators.
//!
//! [`Model`] wraps an [`Evaluator`], which is the raw call surface of a
//! modelling-language engine such as the AMPL solver library (see the
//! `nlp_ampl` crate). The model normalizes maximization problems to
//! minimization, applies optional objective and constraint scaling, and
//! counts the calls made through it.
//!
//! [`closure::ClosureEvaluator`] provides an in-memory evaluator built from
//! closures.

pub mod closure;
pub mod evaluator;
pub mod linop;
pub mod model;
pub mod partition;
pub mod sparse;

pub use crate::evaluator::{Evaluator, ProblemInfo};
pub use crate::model::{Counters, Error, Model, Result};
pub use crate::sparse::{SparseVector, Triple};
