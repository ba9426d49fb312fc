// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sign- and scale-normalized view of an external model.
//!
//! A [`Model`] owns an [`Evaluator`] and presents every problem as a
//! minimization. Optional objective and constraint scaling factors are
//! applied to all values and derivatives on the way out.

use std::ops::Range;

use log::info;
use snafu::Snafu;

use crate::evaluator::{Evaluator, ProblemInfo};
use crate::linop::CoordOperator;
use crate::partition::{BoundPartition, ConstraintPartition};
use crate::sparse::{SparseVector, Triple};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Objective number {} is out of range (model has {})", index, count))]
    ObjectiveIndex { index: usize, count: usize },
    #[snafu(display("Constraint number {} is out of range (model has {})", index, count))]
    ConstraintIndex { index: usize, count: usize },
    #[snafu(display("{} has length {}, expected {}", what, got, expected))]
    Dimension {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[snafu(display("Constraint scaling has length {}, expected {}", got, expected))]
    ScalingLength { expected: usize, got: usize },
    /// Failure reported by the evaluation engine.
    #[snafu(display("{}", message))]
    Evaluation { message: String },
    #[snafu(display("Entry ({}, {}) lies outside the operator", row, col))]
    Operator { row: usize, col: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Number of calls made through a [`Model`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub obj: usize,
    pub grad: usize,
    pub cons: usize,
    pub jac: usize,
    pub hess: usize,
    pub jprod: usize,
    pub jtprod: usize,
    pub hprod: usize,
}

/// Optimization model backed by an external evaluator.
///
/// Maximization problems are negated so callers always minimize. The
/// Lagrangian convention is `L = f - cᵀz`.
pub struct Model<E: Evaluator> {
    evaluator: E,
    name: String,
    cons_part: ConstraintPartition,
    bound_part: BoundPartition,
    scale_obj: Option<f64>,
    scale_con: Option<Vec<f64>>,
    counters: Counters,
    frozen: bool,
}

impl<E: Evaluator> Model<E> {
    pub fn new<S: Into<String>>(evaluator: E, name: S) -> Self {
        let info = evaluator.info();
        let cons_part = ConstraintPartition::new(&info.lcon, &info.ucon);
        let bound_part = BoundPartition::new(&info.lvar, &info.uvar);
        Model {
            evaluator,
            name: name.into(),
            cons_part,
            bound_part,
            scale_obj: None,
            scale_con: None,
            counters: Counters::default(),
            frozen: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn info(&self) -> &ProblemInfo {
        self.evaluator.info()
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Number of variables.
    pub fn n(&self) -> usize {
        self.info().n_var
    }

    /// Number of general constraints.
    pub fn m(&self) -> usize {
        self.info().n_con
    }

    pub fn n_obj(&self) -> usize {
        self.info().n_obj
    }

    pub fn minimize(&self) -> bool {
        self.info().minimize
    }

    pub fn x0(&self) -> &[f64] {
        &self.info().x0
    }

    pub fn pi0(&self) -> &[f64] {
        &self.info().pi0
    }

    pub fn lvar(&self) -> &[f64] {
        &self.info().lvar
    }

    pub fn uvar(&self) -> &[f64] {
        &self.info().uvar
    }

    pub fn lcon(&self) -> &[f64] {
        &self.info().lcon
    }

    pub fn ucon(&self) -> &[f64] {
        &self.info().ucon
    }

    pub fn lin(&self) -> Range<usize> {
        self.info().lin()
    }

    pub fn nln(&self) -> Range<usize> {
        self.info().nln()
    }

    pub fn net(&self) -> Range<usize> {
        self.info().net()
    }

    pub fn nlin(&self) -> usize {
        self.lin().len()
    }

    pub fn nnln(&self) -> usize {
        self.nln().len()
    }

    pub fn nnet(&self) -> usize {
        self.net().len()
    }

    pub fn nnzj(&self) -> usize {
        self.info().nnzj
    }

    pub fn nnzh(&self) -> usize {
        self.info().nnzh
    }

    pub fn constraints_partition(&self) -> &ConstraintPartition {
        &self.cons_part
    }

    pub fn bounds_partition(&self) -> &BoundPartition {
        &self.bound_part
    }

    /// Number of variables subject to at least one bound.
    pub fn nbounds(&self) -> usize {
        self.bound_part.nbounds()
    }

    pub fn nequal(&self) -> usize {
        self.cons_part.equal.len()
    }

    pub fn nlower(&self) -> usize {
        self.cons_part.lower.len()
    }

    pub fn nupper(&self) -> usize {
        self.cons_part.upper.len()
    }

    pub fn nrange(&self) -> usize {
        self.cons_part.range.len()
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = Counters::default();
    }

    pub fn objective_scaling(&self) -> Option<f64> {
        self.scale_obj
    }

    pub fn constraint_scaling(&self) -> Option<&[f64]> {
        self.scale_con.as_deref()
    }

    pub fn set_objective_scaling(&mut self, scale: Option<f64>) {
        self.scale_obj = scale;
    }

    /// Set per-constraint scaling factors.
    ///
    /// The vector must have one entry per constraint. `None` restores
    /// identity scaling.
    pub fn set_constraint_scaling(&mut self, scale: Option<Vec<f64>>) -> Result<()> {
        if let Some(s) = &scale {
            if s.len() != self.m() {
                return Err(Error::ScalingLength {
                    expected: self.m(),
                    got: s.len(),
                });
            }
        }
        self.scale_con = scale;
        Ok(())
    }

    /// Scale the objective so its gradient at `x` is at most `g_max` in
    /// infinity norm.
    ///
    /// Uses unscaled derivatives, so previous objective scaling is replaced.
    pub fn compute_objective_scaling(&mut self, x: &[f64], g_max: f64) -> Result<f64> {
        self.check_len("x", x, self.n())?;
        let g = self.evaluator.grad_obj(0, x)?;
        let gnorm = g.iter().fold(0.0_f64, |a, v| a.max(v.abs()));
        let s = g_max / gnorm.max(g_max);
        self.scale_obj = Some(s);
        Ok(s)
    }

    /// Scale each constraint so its gradient at `x` is at most `g_max` in
    /// infinity norm.
    ///
    /// Uses unscaled derivatives, so previous constraint scaling is replaced.
    pub fn compute_constraint_scaling(&mut self, x: &[f64], g_max: f64) -> Result<&[f64]> {
        self.check_len("x", x, self.n())?;
        let j = self.evaluator.eval_j(x, false)?;
        let mut row_max = vec![0.0_f64; self.m()];
        for (r, _, v) in j.iter() {
            let slot = row_max.get_mut(r).ok_or(Error::Operator { row: r, col: 0 })?;
            *slot = slot.max(v.abs());
        }
        let s: Vec<f64> = row_max.iter().map(|r| g_max / r.max(g_max)).collect();
        self.scale_con = Some(s);
        Ok(self.scale_con.as_deref().unwrap_or_default())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn check_len(&self, what: &'static str, v: &[f64], expected: usize) -> Result<()> {
        if v.len() != expected {
            Err(Error::Dimension {
                what,
                expected,
                got: v.len(),
            })
        } else {
            Ok(())
        }
    }

    fn check_obj(&self, obj_num: usize) -> Result<()> {
        // The native engine does not fail gracefully on a bad index.
        if obj_num >= self.n_obj() {
            Err(Error::ObjectiveIndex {
                index: obj_num,
                count: self.n_obj(),
            })
        } else {
            Ok(())
        }
    }

    fn check_con(&self, i: usize) -> Result<()> {
        if i >= self.m() {
            Err(Error::ConstraintIndex {
                index: i,
                count: self.m(),
            })
        } else {
            Ok(())
        }
    }

    /// Apply objective scaling then the maximization sign.
    fn obj_factor(&self) -> f64 {
        let s = self.scale_obj.unwrap_or(1.0);
        if self.minimize() {
            s
        } else {
            -s
        }
    }

    fn con_factor(&self, i: usize) -> f64 {
        self.scale_con.as_ref().map_or(1.0, |s| s[i])
    }

    /// Objective value at `x`, negated for maximization problems.
    pub fn objective(&mut self, x: &[f64], obj_num: usize) -> Result<f64> {
        self.check_obj(obj_num)?;
        self.check_len("x", x, self.n())?;
        self.counters.obj += 1;
        let f = self.evaluator.eval_obj(obj_num, x)?;
        Ok(f * self.obj_factor())
    }

    /// Dense objective gradient at `x`, negated for maximization problems.
    pub fn gradient(&mut self, x: &[f64], obj_num: usize) -> Result<Vec<f64>> {
        self.check_obj(obj_num)?;
        self.check_len("x", x, self.n())?;
        self.counters.grad += 1;
        let mut g = self.evaluator.grad_obj(obj_num, x)?;
        let factor = self.obj_factor();
        for gi in g.iter_mut() {
            *gi *= factor;
        }
        Ok(g)
    }

    pub fn sparse_gradient(&mut self, x: &[f64]) -> Result<SparseVector> {
        self.check_len("x", x, self.n())?;
        let mut sg = self.evaluator.eval_sgrad(x)?;
        sg.scale(self.obj_factor());
        Ok(sg)
    }

    /// Sparse cost vector of a linear objective.
    pub fn cost_vector(&mut self) -> Result<SparseVector> {
        let mut sc = self.evaluator.eval_cost()?;
        sc.scale(self.obj_factor());
        Ok(sc)
    }

    /// Constraint values at `x` in natural order.
    ///
    /// To visit them by type use [`constraints_partition`](Self::constraints_partition).
    pub fn constraints(&mut self, x: &[f64]) -> Result<Vec<f64>> {
        self.check_len("x", x, self.n())?;
        self.counters.cons += 1;
        let mut c = self.evaluator.eval_cons(x)?;
        if let Some(s) = &self.scale_con {
            for (ci, si) in c.iter_mut().zip(s.iter()) {
                *ci *= si;
            }
        }
        Ok(c)
    }

    pub fn constraint_value(&mut self, i: usize, x: &[f64]) -> Result<f64> {
        self.check_con(i)?;
        self.check_len("x", x, self.n())?;
        Ok(self.evaluator.eval_ci(i, x)? * self.con_factor(i))
    }

    pub fn constraint_gradient_dense(&mut self, i: usize, x: &[f64]) -> Result<Vec<f64>> {
        self.check_con(i)?;
        self.check_len("x", x, self.n())?;
        let mut gi = self.evaluator.eval_gi(i, x)?;
        let factor = self.con_factor(i);
        for v in gi.iter_mut() {
            *v *= factor;
        }
        Ok(gi)
    }

    pub fn constraint_gradient_sparse(&mut self, i: usize, x: &[f64]) -> Result<SparseVector> {
        self.check_con(i)?;
        self.check_len("x", x, self.n())?;
        let mut sgi = self.evaluator.eval_sgi(i, x)?;
        sgi.scale(self.con_factor(i));
        Ok(sgi)
    }

    /// Gradient of the linear part of constraint `i`.
    pub fn linear_constraint_row(&mut self, i: usize) -> Result<SparseVector> {
        self.check_con(i)?;
        let mut row = self.evaluator.eval_row(i)?;
        row.scale(self.con_factor(i));
        Ok(row)
    }

    /// Jacobian of the linear parts of the constraints.
    pub fn linear_jacobian(&mut self, store_zeros: bool) -> Result<Triple> {
        let mut a = self.evaluator.eval_a(store_zeros)?;
        if let Some(s) = &self.scale_con {
            a.scale_rows(s);
        }
        Ok(a)
    }

    fn scaled_jacobian(&mut self, x: &[f64], store_zeros: bool) -> Result<Triple> {
        self.check_len("x", x, self.n())?;
        let mut j = self.evaluator.eval_j(x, store_zeros)?;
        if let Some(s) = &self.scale_con {
            j.scale_rows(s);
        }
        Ok(j)
    }

    /// Constraint Jacobian at `x`.
    pub fn jacobian(&mut self, x: &[f64], store_zeros: bool) -> Result<Triple> {
        self.counters.jac += 1;
        self.scaled_jacobian(x, store_zeros)
    }

    /// Jacobian of the constraints rewritten as one-sided inequalities.
    ///
    /// ```text
    ///   cᵢ(x) = Lᵢ        i in equal
    ///   cᵢ(x) - Lᵢ >= 0   i in lower, range
    ///   Uᵢ - cᵢ(x) >= 0   i in upper, range
    /// ```
    ///
    /// The first `m` rows are the Jacobian in natural order with the rows of
    /// upper-only constraints negated. Rows `m..m + nrange` hold the negated
    /// gradients of the range constraints in their natural relative order.
    pub fn jacobian_reformulated(&mut self, x: &[f64], store_zeros: bool) -> Result<Triple> {
        let m = self.m();
        let mut j = self.jacobian(x, store_zeros)?;

        let mut upper = vec![false; m];
        for &i in &self.cons_part.upper {
            upper[i] = true;
        }
        let mut range_row: Vec<Option<usize>> = vec![None; m];
        for (k, &i) in self.cons_part.range.iter().enumerate() {
            range_row[i] = Some(m + k);
        }

        let mut upper_side = Triple::new();
        for k in 0..j.len() {
            let (r, c) = (j.rows[k], j.cols[k]);
            if r >= m {
                return Err(Error::Operator { row: r, col: c });
            }
            if upper[r] {
                j.vals[k] = -j.vals[k];
            }
            if let Some(row) = range_row[r] {
                upper_side.push(row, c, -j.vals[k]);
            }
        }

        j.vals.extend(upper_side.vals);
        j.rows.extend(upper_side.rows);
        j.cols.extend(upper_side.cols);
        Ok(j)
    }

    /// Jacobian at `x` as a linear operator from `n` to `m`.
    pub fn jacobian_operator(&mut self, x: &[f64]) -> Result<CoordOperator> {
        let j = self.scaled_jacobian(x, false)?;
        Ok(CoordOperator::new(j, self.n(), self.m(), false))
    }

    /// `J(x) p`.
    pub fn jacobian_vector_product(&mut self, x: &[f64], p: &[f64]) -> Result<Vec<f64>> {
        self.counters.jprod += 1;
        self.jacobian_operator(x)?.apply(p)
    }

    /// `J(x)ᵀ p`.
    pub fn jacobian_transpose_vector_product(&mut self, x: &[f64], p: &[f64]) -> Result<Vec<f64>> {
        self.counters.jtprod += 1;
        self.jacobian_operator(x)?.transpose().apply(p)
    }

    /// Multipliers and objective weight as handed to the evaluator.
    fn scaled_multipliers(&self, z: Option<&[f64]>, obj_weight: f64) -> Result<(Vec<f64>, f64)> {
        let mut z = match z {
            Some(z) => {
                self.check_len("multipliers", z, self.m())?;
                z.to_vec()
            }
            None => vec![0.0; self.m()],
        };
        let w = obj_weight * self.scale_obj.unwrap_or(1.0);
        if let Some(s) = &self.scale_con {
            for (zi, si) in z.iter_mut().zip(s.iter()) {
                *zi *= si;
            }
        }
        Ok((z, w))
    }

    /// Lower triangle of the Lagrangian Hessian at `(x, z)`.
    ///
    /// Missing multipliers are taken as zero. `obj_weight` multiplies the
    /// objective term; zero drops it.
    pub fn hessian(
        &mut self,
        x: &[f64],
        z: Option<&[f64]>,
        obj_num: usize,
        obj_weight: f64,
        store_zeros: bool,
    ) -> Result<Triple> {
        self.check_obj(obj_num)?;
        self.check_len("x", x, self.n())?;
        self.counters.hess += 1;
        let (z, w) = self.scaled_multipliers(z, obj_weight)?;
        let mut h = self.evaluator.eval_h(x, &z, w, store_zeros)?;
        if !self.minimize() {
            h.scale(-1.0);
        }
        Ok(h)
    }

    /// Lagrangian Hessian times `v`.
    ///
    /// `x` is only checked for length. The product is formed at the point of
    /// the last [`objective`](Self::objective) or [`gradient`](Self::gradient)
    /// call, or at the frozen point. Evaluate one of those at `x` first.
    pub fn hessian_vector_product(
        &mut self,
        x: &[f64],
        z: Option<&[f64]>,
        v: &[f64],
        obj_weight: f64,
    ) -> Result<Vec<f64>> {
        self.check_len("x", x, self.n())?;
        self.check_len("v", v, self.n())?;
        self.counters.hprod += 1;
        let (z, w) = self.scaled_multipliers(z, obj_weight)?;
        let mut hv = self.evaluator.h_prod(&z, v, w)?;
        if !self.minimize() {
            for e in hv.iter_mut() {
                *e = -*e;
            }
        }
        Ok(hv)
    }

    /// `∇²cᵢ v` at the last evaluated point; see
    /// [`hessian_vector_product`](Self::hessian_vector_product).
    pub fn constraint_hessian_vector_product(
        &mut self,
        x: &[f64],
        i: usize,
        v: &[f64],
    ) -> Result<Vec<f64>> {
        self.check_con(i)?;
        self.check_len("x", x, self.n())?;
        self.check_len("v", v, self.n())?;
        self.counters.hprod += 1;
        let mut z = vec![0.0; self.m()];
        z[i] = -1.0;
        let mut hv = self.evaluator.h_prod(&z, v, 0.0)?;
        let factor = self.con_factor(i);
        for e in hv.iter_mut() {
            *e *= factor;
        }
        Ok(hv)
    }

    /// Vector of `gᵀ∇²cᵢ(x)v` over all constraints.
    pub fn directional_hessian_dot_products(
        &mut self,
        x: &[f64],
        g: &[f64],
        v: &[f64],
    ) -> Result<Vec<f64>> {
        if self.nnln() == 0 {
            return Ok(vec![0.0; self.m()]);
        }
        self.check_len("x", x, self.n())?;
        self.check_len("g", g, self.n())?;
        self.check_len("v", v, self.n())?;
        let mut ghi = self.evaluator.ghi_prod(x, g, v)?;
        if let Some(s) = &self.scale_con {
            for (e, si) in ghi.iter_mut().zip(s.iter()) {
                *e *= si;
            }
        }
        Ok(ghi)
    }

    /// No nonlinear objective, constraint or network terms.
    pub fn is_linear_program(&self) -> bool {
        let info = self.info();
        info.nlo == 0 && info.nlc == 0 && info.nlnc == 0
    }

    /// Fix `x` for subsequent evaluations.
    ///
    /// The evaluator normally checks whether its argument changed since the
    /// last call. While frozen that check is skipped, so only use this when
    /// several calls share the same point. Undo with
    /// [`unfreeze_point`](Self::unfreeze_point).
    pub fn freeze_point(&mut self, x: &[f64]) -> Result<()> {
        self.check_len("x", x, self.n())?;
        self.evaluator.set_x(x)?;
        self.frozen = true;
        Ok(())
    }

    pub fn unfreeze_point(&mut self) -> Result<()> {
        self.evaluator.unset_x()?;
        self.frozen = false;
        Ok(())
    }

    /// Hand a primal-dual solution and message to the evaluator's writer.
    pub fn write_solution(&mut self, x: &[f64], z: &[f64], message: &str) -> Result<()> {
        self.check_len("x", x, self.n())?;
        self.check_len("multipliers", z, self.m())?;
        self.evaluator.write_sol(x, z, message)
    }

    /// Log dimensions and structure of the model.
    pub fn log_basic_info(&self) {
        info!("Problem: {}", self.name);
        info!("Number of variables: {}", self.n());
        info!("Number of variable bounds: {}", self.nbounds());
        info!("Number of general constraints: {}", self.m());
        info!(
            "  equality: {}, lower: {}, upper: {}, range: {}, free: {}",
            self.nequal(),
            self.nlower(),
            self.nupper(),
            self.nrange(),
            self.cons_part.free.len()
        );
        info!(
            "  linear: {}, nonlinear: {}, network: {}",
            self.nlin(),
            self.nnln(),
            self.nnet()
        );
        info!("Number of nonzeros in Jacobian: {}", self.nnzj());
        info!("Number of nonzeros in Lagrangian Hessian: {}", self.nnzh());
        if self.is_linear_program() {
            info!("This problem is a linear program.");
        }
    }
}
