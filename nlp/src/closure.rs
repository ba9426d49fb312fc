// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! In-memory evaluator built from Rust closures.
//!
//! Useful for problems that are not available as AMPL stubs and for
//! exercising a [`Model`](crate::model::Model) without the native library.
//!
//! ```
//! use nlp::closure::ClosureEvaluator;
//! use nlp::model::Model;
//! use nlp::sparse::Triple;
//!
//! let ev = ClosureEvaluator::builder(2, 1)
//!     .objective(|x| x[0] + x[1], |_| vec![1.0, 1.0])
//!     .constraints(
//!         |x| vec![x[0] - x[1]],
//!         |_| {
//!             let mut j = Triple::new();
//!             j.push(0, 0, 1.0);
//!             j.push(0, 1, -1.0);
//!             j
//!         },
//!     )
//!     .build();
//! let mut m = Model::new(ev, "sum");
//! assert_eq!(m.objective(&[1.0, 2.0], 0).unwrap(), 3.0);
//! ```

use crate::evaluator::{Evaluator, ProblemInfo};
use crate::model::{Error, Result};
use crate::sparse::{SparseVector, Triple};

type ObjFn = Box<dyn Fn(&[f64]) -> f64>;
type VecFn = Box<dyn Fn(&[f64]) -> Vec<f64>>;
type JacFn = Box<dyn Fn(&[f64]) -> Triple>;
/// `(x, z, obj_weight)` to the lower triangle of `w∇²f - Σ zᵢ∇²cᵢ`.
type HessFn = Box<dyn Fn(&[f64], &[f64], f64) -> Triple>;

/// Last solution handed to [`Evaluator::write_sol`].
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenSolution {
    pub x: Vec<f64>,
    pub z: Vec<f64>,
    pub message: String,
}

/// Evaluator whose functions and derivatives are plain closures.
///
/// Behaves like the native engine where it matters to a model: Hessian
/// products use the last objective or gradient point, and a point fixed by
/// `set_x` overrides the argument of later calls.
pub struct ClosureEvaluator {
    info: ProblemInfo,
    obj: ObjFn,
    grad: VecFn,
    cons: VecFn,
    jac: JacFn,
    hess: HessFn,
    linear: Option<Triple>,
    last_x: Vec<f64>,
    frozen: Option<Vec<f64>>,
    written: Option<WrittenSolution>,
    calls: usize,
}

impl ClosureEvaluator {
    pub fn builder(n: usize, m: usize) -> Builder {
        Builder::new(n, m)
    }

    /// Number of evaluation calls received.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Point used by the last objective or gradient evaluation.
    pub fn last_point(&self) -> &[f64] {
        &self.last_x
    }

    pub fn written_solution(&self) -> Option<&WrittenSolution> {
        self.written.as_ref()
    }

    fn point(&self, x: &[f64]) -> Vec<f64> {
        self.frozen.clone().unwrap_or_else(|| x.to_vec())
    }

    fn check_con(&self, i: usize) -> Result<()> {
        if i >= self.info.n_con {
            Err(Error::ConstraintIndex {
                index: i,
                count: self.info.n_con,
            })
        } else {
            Ok(())
        }
    }

    fn jacobian_row(&self, i: usize, x: &[f64]) -> Vec<f64> {
        let mut row = vec![0.0; self.info.n_var];
        for (r, c, v) in (self.jac)(x).iter() {
            if r == i {
                row[c] += v;
            }
        }
        row
    }

    /// Linear parts of the constraints.
    ///
    /// Without an explicit matrix, the Jacobian of the linear constraints at
    /// the origin.
    fn linear_part(&self) -> Triple {
        match &self.linear {
            Some(a) => a.clone(),
            None => {
                let lin = self.info.lin();
                let origin = vec![0.0; self.info.n_var];
                let mut a = Triple::new();
                for (r, c, v) in (self.jac)(&origin).iter() {
                    if lin.contains(&r) {
                        a.push(r, c, v);
                    }
                }
                a
            }
        }
    }
}

/// Product of a symmetric matrix, stored as its lower triangle, with `v`.
fn sym_product(lower: &Triple, v: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; v.len()];
    for (r, c, val) in lower.iter() {
        out[r] += val * v[c];
        if r != c {
            out[c] += val * v[r];
        }
    }
    out
}

fn finish(mut t: Triple, store_zeros: bool) -> Triple {
    if !store_zeros {
        t.drop_zeros();
    }
    t
}

impl Evaluator for ClosureEvaluator {
    fn info(&self) -> &ProblemInfo {
        &self.info
    }

    fn eval_obj(&mut self, _obj_num: usize, x: &[f64]) -> Result<f64> {
        self.calls += 1;
        let p = self.point(x);
        let f = (self.obj)(&p);
        self.last_x = p;
        Ok(f)
    }

    fn grad_obj(&mut self, _obj_num: usize, x: &[f64]) -> Result<Vec<f64>> {
        self.calls += 1;
        let p = self.point(x);
        let g = (self.grad)(&p);
        self.last_x = p;
        Ok(g)
    }

    fn eval_sgrad(&mut self, x: &[f64]) -> Result<SparseVector> {
        let g = self.grad_obj(0, x)?;
        Ok(SparseVector::from_dense(&g))
    }

    fn eval_cost(&mut self) -> Result<SparseVector> {
        self.calls += 1;
        let origin = vec![0.0; self.info.n_var];
        Ok(SparseVector::from_dense(&(self.grad)(&origin)))
    }

    fn eval_cons(&mut self, x: &[f64]) -> Result<Vec<f64>> {
        self.calls += 1;
        let p = self.point(x);
        Ok((self.cons)(&p))
    }

    fn eval_ci(&mut self, i: usize, x: &[f64]) -> Result<f64> {
        self.check_con(i)?;
        let c = self.eval_cons(x)?;
        Ok(c[i])
    }

    fn eval_gi(&mut self, i: usize, x: &[f64]) -> Result<Vec<f64>> {
        self.check_con(i)?;
        self.calls += 1;
        let p = self.point(x);
        Ok(self.jacobian_row(i, &p))
    }

    fn eval_sgi(&mut self, i: usize, x: &[f64]) -> Result<SparseVector> {
        let gi = self.eval_gi(i, x)?;
        Ok(SparseVector::from_dense(&gi))
    }

    fn eval_row(&mut self, i: usize) -> Result<SparseVector> {
        self.check_con(i)?;
        self.calls += 1;
        let a = self.linear_part();
        Ok(SparseVector::from_pairs(
            self.info.n_var,
            a.iter().filter(|&(r, _, _)| r == i).map(|(_, c, v)| (c, v)),
        ))
    }

    fn eval_a(&mut self, store_zeros: bool) -> Result<Triple> {
        self.calls += 1;
        Ok(finish(self.linear_part(), store_zeros))
    }

    fn eval_j(&mut self, x: &[f64], store_zeros: bool) -> Result<Triple> {
        self.calls += 1;
        let p = self.point(x);
        Ok(finish((self.jac)(&p), store_zeros))
    }

    fn eval_h(
        &mut self,
        x: &[f64],
        z: &[f64],
        obj_weight: f64,
        store_zeros: bool,
    ) -> Result<Triple> {
        self.calls += 1;
        let p = self.point(x);
        Ok(finish((self.hess)(&p, z, obj_weight), store_zeros))
    }

    fn h_prod(&mut self, z: &[f64], v: &[f64], obj_weight: f64) -> Result<Vec<f64>> {
        self.calls += 1;
        let p = self.point(&self.last_x);
        let h = (self.hess)(&p, z, obj_weight);
        Ok(sym_product(&h, v))
    }

    fn ghi_prod(&mut self, x: &[f64], g: &[f64], v: &[f64]) -> Result<Vec<f64>> {
        self.calls += 1;
        let p = self.point(x);
        let m = self.info.n_con;
        let mut out = Vec::with_capacity(m);
        let mut z = vec![0.0; m];
        for i in 0..m {
            // z = -eᵢ and no objective term leaves ∇²cᵢ.
            z[i] = -1.0;
            let hv = sym_product(&(self.hess)(&p, &z, 0.0), v);
            z[i] = 0.0;
            out.push(g.iter().zip(hv.iter()).map(|(a, b)| a * b).sum());
        }
        Ok(out)
    }

    fn set_x(&mut self, x: &[f64]) -> Result<()> {
        self.frozen = Some(x.to_vec());
        self.last_x = x.to_vec();
        Ok(())
    }

    fn unset_x(&mut self) -> Result<()> {
        self.frozen = None;
        Ok(())
    }

    fn write_sol(&mut self, x: &[f64], z: &[f64], msg: &str) -> Result<()> {
        self.written = Some(WrittenSolution {
            x: x.to_vec(),
            z: z.to_vec(),
            message: msg.to_string(),
        });
        Ok(())
    }
}

/// Builder for [`ClosureEvaluator`].
///
/// Defaults: zero objective, zero constraints with `0 <= c(x) <= 0`, free
/// variables, start at the origin, minimization, one nonlinear objective and
/// all constraints nonlinear.
pub struct Builder {
    info: ProblemInfo,
    obj: ObjFn,
    grad: VecFn,
    cons: VecFn,
    jac: JacFn,
    hess: HessFn,
    linear: Option<Triple>,
}

impl Builder {
    fn new(n: usize, m: usize) -> Self {
        Builder {
            info: ProblemInfo {
                n_var: n,
                n_con: m,
                n_obj: 1,
                minimize: true,
                x0: vec![0.0; n],
                pi0: vec![0.0; m],
                lvar: vec![f64::NEG_INFINITY; n],
                uvar: vec![f64::INFINITY; n],
                lcon: vec![0.0; m],
                ucon: vec![0.0; m],
                nlo: 1,
                nlc: m,
                nlnc: 0,
                nnzj: 0,
                nnzh: 0,
            },
            obj: Box::new(|_| 0.0),
            grad: Box::new(move |_| vec![0.0; n]),
            cons: Box::new(move |_| vec![0.0; m]),
            jac: Box::new(|_| Triple::new()),
            hess: Box::new(|_, _, _| Triple::new()),
            linear: None,
        }
    }

    pub fn objective<F, G>(mut self, f: F, grad: G) -> Self
    where
        F: Fn(&[f64]) -> f64 + 'static,
        G: Fn(&[f64]) -> Vec<f64> + 'static,
    {
        self.obj = Box::new(f);
        self.grad = Box::new(grad);
        self
    }

    /// Constraint bodies and their Jacobian triple.
    pub fn constraints<C, J>(mut self, cons: C, jac: J) -> Self
    where
        C: Fn(&[f64]) -> Vec<f64> + 'static,
        J: Fn(&[f64]) -> Triple + 'static,
    {
        self.cons = Box::new(cons);
        self.jac = Box::new(jac);
        self
    }

    /// Lower triangle of the Lagrangian Hessian at `(x, z, obj_weight)`.
    pub fn hessian<H>(mut self, hess: H) -> Self
    where
        H: Fn(&[f64], &[f64], f64) -> Triple + 'static,
    {
        self.hess = Box::new(hess);
        self
    }

    /// Explicit Jacobian of the linear constraint parts.
    pub fn linear_jacobian(mut self, a: Triple) -> Self {
        self.linear = Some(a);
        self
    }

    pub fn maximize(mut self) -> Self {
        self.info.minimize = false;
        self
    }

    pub fn objectives(mut self, n_obj: usize) -> Self {
        self.info.n_obj = n_obj;
        self
    }

    pub fn start(mut self, x0: Vec<f64>) -> Self {
        self.info.x0 = x0;
        self
    }

    pub fn multipliers(mut self, pi0: Vec<f64>) -> Self {
        self.info.pi0 = pi0;
        self
    }

    pub fn variable_bounds(mut self, lvar: Vec<f64>, uvar: Vec<f64>) -> Self {
        self.info.lvar = lvar;
        self.info.uvar = uvar;
        self
    }

    pub fn constraint_bounds(mut self, lcon: Vec<f64>, ucon: Vec<f64>) -> Self {
        self.info.lcon = lcon;
        self.info.ucon = ucon;
        self
    }

    /// Number of nonlinear objectives and nonlinear constraints. Nonlinear
    /// constraints must come first.
    pub fn nonlinear(mut self, nlo: usize, nlc: usize) -> Self {
        self.info.nlo = nlo;
        self.info.nlc = nlc;
        self
    }

    /// Number of network constraints, which follow the nonlinear ones.
    pub fn network(mut self, nlnc: usize) -> Self {
        self.info.nlnc = nlnc;
        self
    }

    pub fn build(self) -> ClosureEvaluator {
        let mut info = self.info;
        info.nnzj = (self.jac)(&info.x0).len();
        info.nnzh = (self.hess)(&info.x0, &vec![1.0; info.n_con], 1.0).len();
        let last_x = info.x0.clone();
        ClosureEvaluator {
            info,
            obj: self.obj,
            grad: self.grad,
            cons: self.cons,
            jac: self.jac,
            hess: self.hess,
            linear: self.linear,
            last_x,
            frozen: None,
            written: None,
            calls: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // f = x0² x1, c0 = x0 x1 (nonlinear), c1 = x0 + 2 x1 (linear).
    fn evaluator() -> ClosureEvaluator {
        ClosureEvaluator::builder(2, 2)
            .objective(
                |x| x[0] * x[0] * x[1],
                |x| vec![2.0 * x[0] * x[1], x[0] * x[0]],
            )
            .constraints(
                |x| vec![x[0] * x[1], x[0] + 2.0 * x[1]],
                |x| {
                    let mut j = Triple::new();
                    j.push(0, 0, x[1]);
                    j.push(0, 1, x[0]);
                    j.push(1, 0, 1.0);
                    j.push(1, 1, 2.0);
                    j
                },
            )
            .hessian(|x, z, w| {
                let mut h = Triple::new();
                h.push(0, 0, w * 2.0 * x[1]);
                h.push(1, 0, w * 2.0 * x[0] - z[0]);
                h.push(1, 1, 0.0);
                h
            })
            .nonlinear(1, 1)
            .start(vec![1.0, 1.0])
            .build()
    }

    #[test]
    fn sparsity_counts() {
        let ev = evaluator();
        assert_eq!(ev.info().nnzj, 4);
        assert_eq!(ev.info().nnzh, 3);
        assert_eq!(ev.info().lin(), 1..2);
    }

    #[test]
    fn store_zeros() {
        let mut ev = evaluator();
        let h = ev.eval_h(&[1.0, 1.0], &[0.0, 0.0], 1.0, true).unwrap();
        assert_eq!(h.len(), 3);
        let h = ev.eval_h(&[1.0, 1.0], &[0.0, 0.0], 1.0, false).unwrap();
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn linear_row_from_origin() {
        let mut ev = evaluator();
        let row = ev.eval_row(1).unwrap();
        assert_eq!(row.entries(), vec![(0, 1.0), (1, 2.0)]);
        assert_eq!(ev.eval_row(0).unwrap().nnz(), 0);
        assert!(ev.eval_row(2).is_err());
    }

    #[test]
    fn hessian_product_uses_last_point() {
        let mut ev = evaluator();
        ev.eval_obj(0, &[3.0, 1.0]).unwrap();
        // H = [2 x1, 2 x0; 2 x0, 0] at (3, 1)
        let hv = ev.h_prod(&[0.0, 0.0], &[1.0, 0.0], 1.0).unwrap();
        assert_eq!(hv, vec![2.0, 6.0]);
    }

    #[test]
    fn frozen_point_overrides_argument() {
        let mut ev = evaluator();
        ev.set_x(&[2.0, 2.0]).unwrap();
        assert_eq!(ev.eval_obj(0, &[0.0, 0.0]).unwrap(), 8.0);
        ev.unset_x().unwrap();
        assert_eq!(ev.eval_obj(0, &[0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn ghi_products() {
        let mut ev = evaluator();
        // ∇²c0 = [0 1; 1 0], ∇²c1 = 0
        let ghi = ev.ghi_prod(&[1.0, 1.0], &[1.0, 2.0], &[3.0, 4.0]).unwrap();
        assert_eq!(ghi, vec![1.0 * 4.0 + 2.0 * 3.0, 0.0]);
    }
}
