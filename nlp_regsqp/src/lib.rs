// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Regularized SQP for equality-constrained `nlp` models, and a batch
//! driver that reports on a list of problems.
//!
//! ```
//! use nlp::closure::ClosureEvaluator;
//! use nlp::model::Model;
//! use nlp::sparse::Triple;
//! use nlp_regsqp::{RegSqp, SolverOptions};
//!
//! // min x0² + x1² s.t. x0 + x1 = 1
//! let ev = ClosureEvaluator::builder(2, 1)
//!     .objective(|x| x[0] * x[0] + x[1] * x[1], |x| vec![2.0 * x[0], 2.0 * x[1]])
//!     .constraints(
//!         |x| vec![x[0] + x[1]],
//!         |_| {
//!             let mut j = Triple::new();
//!             j.push(0, 0, 1.0);
//!             j.push(0, 1, 1.0);
//!             j
//!         },
//!     )
//!     .hessian(|_, _, w| {
//!         let mut h = Triple::new();
//!         h.push(0, 0, 2.0 * w);
//!         h.push(1, 1, 2.0 * w);
//!         h
//!     })
//!     .constraint_bounds(vec![1.0], vec![1.0])
//!     .nonlinear(1, 0)
//!     .build();
//! let mut model = Model::new(ev, "circle");
//! let mut solver = RegSqp::new(SolverOptions::default());
//! solver.solve(&mut model).unwrap();
//! assert_eq!(solver.short_status(), "opt");
//! assert!((solver.x[0] - 0.5).abs() < 1e-6);
//! ```

pub mod driver;
pub mod lbfgs;
pub mod solver;

pub use crate::solver::{RegSqp, SolverOptions};

use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(context(false), display("{}", source))]
    Model { source: nlp::Error },
    #[snafu(display("KKT system is singular with regularization {:e}", rho))]
    Factorization { rho: f64 },
    #[snafu(display("Line search failed after {} steps", steps))]
    LineSearch { steps: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
