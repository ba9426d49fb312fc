// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Raw call surface of an external model evaluator.
//!
//! Implementations return values exactly as the underlying engine computes
//! them: no sign changes for maximization and no scaling. Those are applied
//! by [`Model`](crate::model::Model).

use std::ops::Range;

use crate::model::Result;
use crate::sparse::{SparseVector, Triple};

/// Static description of a problem, read once when the evaluator is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemInfo {
    pub n_var: usize,
    pub n_con: usize,
    pub n_obj: usize,
    /// `false` for maximization problems.
    pub minimize: bool,
    pub x0: Vec<f64>,
    pub pi0: Vec<f64>,
    pub lvar: Vec<f64>,
    pub uvar: Vec<f64>,
    pub lcon: Vec<f64>,
    pub ucon: Vec<f64>,
    /// Nonlinear objectives.
    pub nlo: usize,
    /// Nonlinear general constraints.
    pub nlc: usize,
    /// Nonlinear network constraints.
    pub nlnc: usize,
    /// Nonzeros in the constraint Jacobian.
    pub nnzj: usize,
    /// Nonzeros in the lower triangle of the Lagrangian Hessian.
    pub nnzh: usize,
}

impl ProblemInfo {
    // Constraints are ordered nonlinear, network, then linear.

    pub fn nln(&self) -> Range<usize> {
        0..self.nlc
    }

    pub fn net(&self) -> Range<usize> {
        self.nlc..self.nlc + self.nlnc
    }

    pub fn lin(&self) -> Range<usize> {
        (self.nlc + self.nlnc).min(self.n_con)..self.n_con
    }
}

/// Evaluation engine behind a [`Model`](crate::model::Model).
///
/// Methods that take `&mut self` may update state kept by the engine, such
/// as the last evaluation point.
pub trait Evaluator {
    fn info(&self) -> &ProblemInfo;

    /// Objective `obj_num` at `x`.
    fn eval_obj(&mut self, obj_num: usize, x: &[f64]) -> Result<f64>;
    /// Dense objective gradient.
    fn grad_obj(&mut self, obj_num: usize, x: &[f64]) -> Result<Vec<f64>>;
    /// Sparse gradient of the first objective.
    fn eval_sgrad(&mut self, x: &[f64]) -> Result<SparseVector>;
    /// Linear part of the first objective.
    fn eval_cost(&mut self) -> Result<SparseVector>;

    /// All constraint bodies, natural order.
    fn eval_cons(&mut self, x: &[f64]) -> Result<Vec<f64>>;
    fn eval_ci(&mut self, i: usize, x: &[f64]) -> Result<f64>;
    fn eval_gi(&mut self, i: usize, x: &[f64]) -> Result<Vec<f64>>;
    fn eval_sgi(&mut self, i: usize, x: &[f64]) -> Result<SparseVector>;
    /// Linear part of constraint `i`.
    fn eval_row(&mut self, i: usize) -> Result<SparseVector>;

    /// Jacobian of the linear parts of the constraints.
    fn eval_a(&mut self, store_zeros: bool) -> Result<Triple>;
    fn eval_j(&mut self, x: &[f64], store_zeros: bool) -> Result<Triple>;

    /// Lower triangle of `obj_weight * ∇²f(x) - Σ zᵢ∇²cᵢ(x)`.
    fn eval_h(&mut self, x: &[f64], z: &[f64], obj_weight: f64, store_zeros: bool)
        -> Result<Triple>;

    /// Lagrangian Hessian times `v`.
    ///
    /// There is no point argument: the product is formed at the point last
    /// used for an objective or gradient evaluation (or the point fixed with
    /// `set_x`).
    fn h_prod(&mut self, z: &[f64], v: &[f64], obj_weight: f64) -> Result<Vec<f64>>;

    /// Vector of `gᵀ∇²cᵢ(x)v` for every constraint `i`.
    fn ghi_prod(&mut self, x: &[f64], g: &[f64], v: &[f64]) -> Result<Vec<f64>>;

    /// Fix `x` for the following calls and skip change detection.
    fn set_x(&mut self, x: &[f64]) -> Result<()>;
    fn unset_x(&mut self) -> Result<()>;

    fn write_sol(&mut self, x: &[f64], z: &[f64], msg: &str) -> Result<()>;
}
