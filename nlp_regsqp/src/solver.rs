// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Regularized SQP iteration.
//!
//! Solves `min f(x) s.t. c(x) = L` by Newton steps on the regularized KKT
//! system
//!
//! ```text
//!   [ H + ρI   Jᵀ ] [  Δx ]     [ ∇L ]
//!   [ J       -δI ] [ -Δy ] = - [ c  ]
//! ```
//!
//! with `δ` tied to the current KKT residual. A full step is taken when it
//! reduces the residual enough, otherwise a backtracking search on the
//! augmented Lagrangian merit function decides the step length.

use std::fmt;
use std::time::Instant;

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use nlp::{Evaluator, Model};

use crate::lbfgs::Lbfgs;
use crate::{Error, Result};

const RHO_MIN: f64 = 1e-8;
const RHO_MAX: f64 = 1e8;
const DELTA_MAX: f64 = 1.0;
const DELTA_MIN: f64 = 1e-12;
const ARMIJO: f64 = 1e-4;
const STEP_MIN: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Absolute stopping tolerance.
    pub abstol: f64,
    /// Relative stopping tolerance.
    pub reltol: f64,
    /// Sufficient decrease of the KKT residual for a full step.
    pub theta: f64,
    pub maxiter: usize,
    /// Quasi-Newton memory.
    pub npairs: usize,
    /// Use L-BFGS in place of the exact Lagrangian Hessian.
    pub quasi_newton: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            abstol: 1e-7,
            reltol: 1e-6,
            theta: 0.99,
            maxiter: 1000,
            npairs: 6,
            quasi_newton: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    NotSolved,
    Optimal,
    IterationLimit,
    Failed,
}

impl Status {
    /// Status code used in reports.
    pub fn short(&self) -> &'static str {
        match self {
            Status::NotSolved => "unk",
            Status::Optimal => "opt",
            Status::IterationLimit => "itr",
            Status::Failed => "fail",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Status::NotSolved => "not solved",
            Status::Optimal => "optimal solution found",
            Status::IterationLimit => "maximum number of iterations reached",
            Status::Failed => "solver failed",
        };
        write!(f, "{}", s)
    }
}

/// Function values and derivatives at one point.
struct Iterate {
    f: f64,
    g: Vec<f64>,
    /// `c(x) - L`.
    c: Vec<f64>,
    j: DMatrix<f64>,
}

impl Iterate {
    /// `∇f - Jᵀy`.
    fn lagrangian_gradient(&self, y: &[f64]) -> Vec<f64> {
        let jty = self.j.tr_mul(&DVector::from_column_slice(y));
        self.g.iter().zip(jty.iter()).map(|(g, v)| g - v).collect()
    }

    /// `f - yᵀc + ‖c‖² / 2δ`.
    fn merit(&self, y: &[f64], delta: f64) -> f64 {
        merit(self.f, &self.c, y, delta)
    }
}

fn merit(f: f64, c: &[f64], y: &[f64], delta: f64) -> f64 {
    let yc: f64 = y.iter().zip(c.iter()).map(|(a, b)| a * b).sum();
    let cc: f64 = c.iter().map(|v| v * v).sum();
    f - yc + cc / (2.0 * delta)
}

fn norm_inf(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |a, e| a.max(e.abs()))
}

fn axpy(x: &[f64], t: f64, d: &[f64]) -> Vec<f64> {
    x.iter().zip(d.iter()).map(|(a, b)| a + t * b).collect()
}

/// Least-squares multipliers `argmin ‖∇f - Jᵀy‖`, or `None` when `JJᵀ` is
/// singular.
fn least_squares_multipliers(point: &Iterate) -> Option<Vec<f64>> {
    let jg = &point.j * DVector::from_column_slice(&point.g);
    let y = (&point.j * point.j.transpose()).lu().solve(&jg)?;
    if y.iter().all(|v| v.is_finite()) {
        Some(y.iter().cloned().collect())
    } else {
        None
    }
}

fn bump(rho: f64) -> Result<f64> {
    let next = if rho == 0.0 { RHO_MIN } else { rho * 10.0 };
    if next > RHO_MAX {
        Err(Error::Factorization { rho })
    } else {
        Ok(next)
    }
}

/// Regularized SQP solver.
///
/// The fields hold the progress of the last call to [`solve`](Self::solve)
/// and stay readable when it fails.
#[derive(Debug, Clone)]
pub struct RegSqp {
    pub options: SolverOptions,
    pub status: Status,
    /// Outer iterations.
    pub itn: usize,
    /// Backtracking steps and regularization increases.
    pub inner_itn: usize,
    pub f0: f64,
    pub f: f64,
    pub cnorm: Option<f64>,
    pub gl_norm: Option<f64>,
    /// Seconds spent in the last solve.
    pub tsolve: Option<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl RegSqp {
    pub fn new(options: SolverOptions) -> Self {
        RegSqp {
            options,
            status: Status::NotSolved,
            itn: 0,
            inner_itn: 0,
            f0: 0.0,
            f: 0.0,
            cnorm: None,
            gl_norm: None,
            tsolve: None,
            x: Vec::new(),
            y: Vec::new(),
        }
    }

    pub fn short_status(&self) -> &'static str {
        self.status.short()
    }

    /// Solve from the starting point of `model`.
    pub fn solve<E: Evaluator>(&mut self, model: &mut Model<E>) -> Result<Status> {
        self.status = Status::NotSolved;
        self.itn = 0;
        self.inner_itn = 0;
        self.cnorm = None;
        self.gl_norm = None;
        self.tsolve = None;
        self.x = model.x0().to_vec();
        self.y = model.pi0().to_vec();

        let start = Instant::now();
        let result = self.iterate(model);
        self.tsolve = Some(start.elapsed().as_secs_f64());

        match result {
            Ok(status) => {
                self.status = status;
                info!("{}: {}", model.name(), status);
                Ok(status)
            }
            Err(e) => {
                self.status = Status::Failed;
                Err(e)
            }
        }
    }

    fn evaluate<E: Evaluator>(&self, model: &mut Model<E>, x: &[f64]) -> Result<Iterate> {
        let (n, m) = (model.n(), model.m());
        let f = model.objective(x, 0)?;
        let g = model.gradient(x, 0)?;
        let c = model
            .constraints(x)?
            .iter()
            .zip(model.lcon().iter())
            .map(|(c, l)| c - l)
            .collect();
        let mut j = DMatrix::zeros(m, n);
        for (r, col, v) in model.jacobian(x, false)?.iter() {
            if r >= m || col >= n {
                return Err(nlp::Error::Operator { row: r, col }.into());
            }
            j[(r, col)] += v;
        }
        Ok(Iterate { f, g, c, j })
    }

    fn value<E: Evaluator>(&self, model: &mut Model<E>, x: &[f64]) -> Result<(f64, Vec<f64>)> {
        let f = model.objective(x, 0)?;
        let c = model
            .constraints(x)?
            .iter()
            .zip(model.lcon().iter())
            .map(|(c, l)| c - l)
            .collect();
        Ok((f, c))
    }

    /// Dense Hessian of `f - yᵀc` from its lower triangle.
    ///
    /// The model negates the whole evaluator Hessian of a maximization
    /// problem, so the multipliers go in with their sign flipped to keep the
    /// constraint curvature of the minimization form.
    fn hessian<E: Evaluator>(
        &self,
        model: &mut Model<E>,
        x: &[f64],
        y: &[f64],
    ) -> Result<DMatrix<f64>> {
        let n = model.n();
        let z: Vec<f64> = if model.minimize() {
            y.to_vec()
        } else {
            y.iter().map(|v| -v).collect()
        };
        let mut h = DMatrix::zeros(n, n);
        for (r, c, v) in model.hessian(x, Some(&z), 0, 1.0, false)?.iter() {
            if r >= n || c >= n {
                return Err(nlp::Error::Operator { row: r, col: c }.into());
            }
            h[(r, c)] += v;
            if r != c {
                h[(c, r)] += v;
            }
        }
        Ok(h)
    }

    /// Solve the regularized KKT system, raising `rho` until it factorizes.
    fn kkt_step(
        &mut self,
        h: &DMatrix<f64>,
        point: &Iterate,
        gl: &[f64],
        delta: f64,
        rho: &mut f64,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let n = h.nrows();
        let m = point.c.len();
        let rhs = -DVector::from_iterator(n + m, gl.iter().chain(point.c.iter()).cloned());
        loop {
            let mut k = DMatrix::zeros(n + m, n + m);
            k.view_mut((0, 0), (n, n)).copy_from(h);
            for i in 0..n {
                k[(i, i)] += *rho;
            }
            k.view_mut((0, n), (n, m)).copy_from(&point.j.transpose());
            k.view_mut((n, 0), (m, n)).copy_from(&point.j);
            for i in n..n + m {
                k[(i, i)] = -delta;
            }
            match k.lu().solve(&rhs) {
                Some(sol) if sol.iter().all(|v| v.is_finite()) => {
                    let dx = sol.rows(0, n).iter().cloned().collect();
                    let dy = sol.rows(n, m).iter().map(|v| -v).collect();
                    return Ok((dx, dy));
                }
                _ => {
                    *rho = bump(*rho)?;
                    self.inner_itn += 1;
                    debug!("KKT factorization failed, regularization {:8.1e}", rho);
                }
            }
        }
    }

    fn iterate<E: Evaluator>(&mut self, model: &mut Model<E>) -> Result<Status> {
        let n = model.n();
        let opts = self.options.clone();
        let mut x = self.x.clone();
        let mut y = self.y.clone();
        let mut point = self.evaluate(model, &x)?;
        if !y.is_empty() && y.iter().all(|&v| v == 0.0) {
            if let Some(estimate) = least_squares_multipliers(&point) {
                y = estimate;
            }
        }
        let mut gl = point.lagrangian_gradient(&y);
        let mut lbfgs = Lbfgs::new(opts.npairs);

        self.f0 = point.f;
        let gtol = opts.abstol + opts.reltol * norm_inf(&gl);
        let ctol = opts.abstol + opts.reltol * norm_inf(&point.c);

        // ρ and δ are the values of the accepted step.
        debug!(
            "{:>5} {:>6} {:>9} {:>8} {:>8} {:>8} {:>8}",
            "iter", "inner", "f", "‖c‖", "‖∇L‖", "ρ", "δ"
        );
        loop {
            let gln = norm_inf(&gl);
            let cn = norm_inf(&point.c);
            self.f = point.f;
            self.gl_norm = Some(gln);
            self.cnorm = Some(cn);
            self.x.clone_from(&x);
            self.y.clone_from(&y);

            if gln <= gtol && cn <= ctol {
                return Ok(Status::Optimal);
            }
            if self.itn >= opts.maxiter {
                return Ok(Status::IterationLimit);
            }

            let residual = gln.max(cn);
            let delta = residual.min(DELTA_MAX).max(DELTA_MIN);
            let h = if opts.quasi_newton {
                lbfgs.matrix(n)
            } else {
                self.hessian(model, &x, &y)?
            };

            let mut rho = 0.0;
            let (x_new, y_new, next) = loop {
                let (dx, dy) = self.kkt_step(&h, &point, &gl, delta, &mut rho)?;
                let x_trial = axpy(&x, 1.0, &dx);
                let y_trial = axpy(&y, 1.0, &dy);
                let trial = self.evaluate(model, &x_trial)?;
                let gl_trial = trial.lagrangian_gradient(&y_trial);
                if norm_inf(&gl_trial).max(norm_inf(&trial.c)) <= opts.theta * residual {
                    break (x_trial, y_trial, trial);
                }

                // ∇ψ = ∇L + Jᵀc / δ
                let jtc = point.j.tr_mul(&DVector::from_column_slice(&point.c));
                let slope: f64 = gl
                    .iter()
                    .zip(jtc.iter())
                    .zip(dx.iter())
                    .map(|((g, v), d)| (g + v / delta) * d)
                    .sum();
                if slope >= 0.0 {
                    rho = bump(rho)?;
                    self.inner_itn += 1;
                    debug!("Not a descent direction, regularization {:8.1e}", rho);
                    continue;
                }

                let psi = point.merit(&y, delta);
                if trial.merit(&y, delta) <= psi + ARMIJO * slope {
                    break (x_trial, y_trial, trial);
                }
                let mut t = 1.0;
                let mut steps = 0;
                loop {
                    t /= 2.0;
                    steps += 1;
                    self.inner_itn += 1;
                    if t < STEP_MIN {
                        return Err(Error::LineSearch { steps });
                    }
                    let xt = axpy(&x, t, &dx);
                    let (ft, ct) = self.value(model, &xt)?;
                    if merit(ft, &ct, &y, delta) <= psi + ARMIJO * t * slope {
                        break;
                    }
                }
                let x_step = axpy(&x, t, &dx);
                let y_step = axpy(&y, t, &dy);
                let accepted = self.evaluate(model, &x_step)?;
                break (x_step, y_step, accepted);
            };

            if opts.quasi_newton {
                // ∇L(x⁺, y⁺) - ∇L(x, y⁺)
                let gl_new = next.lagrangian_gradient(&y_new);
                let jty_old = model.jacobian_transpose_vector_product(&x, &y_new)?;
                let s: Vec<f64> = x_new.iter().zip(x.iter()).map(|(a, b)| a - b).collect();
                let yk: Vec<f64> = gl_new
                    .iter()
                    .zip(point.g.iter().zip(jty_old.iter()))
                    .map(|(a, (g, v))| a - (g - v))
                    .collect();
                lbfgs.update(&s, &yk);
            }

            self.itn += 1;
            x = x_new;
            y = y_new;
            point = next;
            gl = point.lagrangian_gradient(&y);
            debug!(
                "{:5} {:6} {:9.2e} {:8.1e} {:8.1e} {:8.1e} {:8.1e}",
                self.itn,
                self.inner_itn,
                point.f,
                norm_inf(&point.c),
                norm_inf(&gl),
                rho,
                delta
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlp::closure::ClosureEvaluator;
    use nlp::sparse::Triple;

    // min (x0 - 1)² + (x1 - 2)² s.t. x0 - x1 = 0
    fn model() -> Model<ClosureEvaluator> {
        let ev = ClosureEvaluator::builder(2, 1)
            .objective(
                |x| (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2),
                |x| vec![2.0 * (x[0] - 1.0), 2.0 * (x[1] - 2.0)],
            )
            .constraints(
                |x| vec![x[0] - x[1]],
                |_| {
                    let mut j = Triple::new();
                    j.push(0, 0, 1.0);
                    j.push(0, 1, -1.0);
                    j
                },
            )
            .hessian(|_, _, w| {
                let mut h = Triple::new();
                h.push(0, 0, 2.0 * w);
                h.push(1, 1, 2.0 * w);
                h
            })
            .nonlinear(1, 0)
            .build();
        Model::new(ev, "diag")
    }

    #[test]
    fn defaults() {
        let o = SolverOptions::default();
        assert_eq!(o.maxiter, 1000);
        assert_eq!(o.npairs, 6);
        assert!(!o.quasi_newton);
        assert_eq!(RegSqp::new(o).short_status(), "unk");
    }

    #[test]
    fn rho_bumps() {
        assert_eq!(bump(0.0).unwrap(), 1e-8);
        assert!((bump(1e-8).unwrap() - 1e-7).abs() < 1e-20);
        assert!(bump(1e8).is_err());
    }

    #[test]
    fn merit_value() {
        // 3 - 2·1 + 1 / (2·0.5)
        assert_eq!(merit(3.0, &[1.0], &[2.0], 0.5), 2.0);
    }

    #[test]
    fn exact_newton() {
        let mut m = model();
        let mut s = RegSqp::new(SolverOptions::default());
        assert_eq!(s.solve(&mut m).unwrap(), Status::Optimal);
        assert!((s.x[0] - 1.5).abs() < 1e-6);
        assert!((s.x[1] - 1.5).abs() < 1e-6);
        assert!((s.y[0] - 1.0).abs() < 1e-5);
        assert!((s.f - 0.5).abs() < 1e-6);
        assert_eq!(s.f0, 5.0);
        assert!(s.tsolve.is_some());
        assert!(m.counters().hess > 0);
    }

    #[test]
    fn initial_multiplier_estimate() {
        let mut m = model();
        let s = RegSqp::new(SolverOptions::default());
        let point = s.evaluate(&mut m, &[0.0, 0.0]).unwrap();
        // ∇f = (-2, -4), J = [1 -1]
        assert_eq!(least_squares_multipliers(&point), Some(vec![1.0]));

        // With the exact multiplier the first Newton step lands on the
        // solution.
        let mut s = RegSqp::new(SolverOptions::default());
        assert_eq!(s.solve(&mut m).unwrap(), Status::Optimal);
        assert_eq!(s.itn, 1);
        assert_eq!(s.inner_itn, 0);
    }

    #[test]
    fn iteration_limit() {
        let mut m = model();
        let mut s = RegSqp::new(SolverOptions {
            maxiter: 0,
            ..SolverOptions::default()
        });
        assert_eq!(s.solve(&mut m).unwrap(), Status::IterationLimit);
        assert_eq!(s.short_status(), "itr");
        assert_eq!(s.itn, 0);
        assert_eq!(s.cnorm, Some(0.0));
    }
}
