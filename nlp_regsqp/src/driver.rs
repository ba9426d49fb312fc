// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Solve a list of problems in turn and report one line per problem.
//!
//! Only equality-constrained problems without variable bounds are
//! attempted. Anything else is logged and skipped, as are problems that
//! fail to load. A solver error does not stop the batch: its message is
//! reported as the status of that problem.

use std::fmt;

use log::{error, info};
use nlp::{Evaluator, Model};

use crate::solver::{RegSqp, SolverOptions, Status};

/// Why a problem was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub nbounds: usize,
    pub ninequalities: usize,
    pub nequal: usize,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.nequal == 0 && self.nbounds == 0 && self.ninequalities == 0 {
            write!(f, "{} has no equality constraints", self.name)
        } else {
            write!(
                f,
                "{} has {} bounds and {} inequality constraints",
                self.name, self.nbounds, self.ninequalities
            )
        }
    }
}

/// Accept only problems with equality constraints and nothing else.
pub fn screen<E: Evaluator>(model: &Model<E>) -> Result<(), Rejection> {
    let ninequalities = model.nlower() + model.nupper() + model.nrange();
    if model.nbounds() > 0 || ninequalities > 0 || model.nequal() == 0 {
        Err(Rejection {
            name: model.name().to_string(),
            nbounds: model.nbounds(),
            ninequalities,
            nequal: model.nequal(),
        })
    } else {
        Ok(())
    }
}

/// Per-problem statistics. Negative values flag a solve that did not end
/// at an optimal point; norms and times never computed are `-1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveStats {
    pub iter: i64,
    pub fcalls: i64,
    pub gcalls: i64,
    pub hcalls: i64,
    /// Jacobian and transposed Jacobian products.
    pub jprod: i64,
    pub cnorm: f64,
    pub gl_norm: f64,
    pub tsolve: f64,
}

impl SolveStats {
    pub fn collect<E: Evaluator>(solver: &RegSqp, model: &Model<E>) -> Self {
        let c = model.counters();
        let stats = SolveStats {
            iter: solver.itn as i64,
            fcalls: c.obj as i64,
            gcalls: c.grad as i64,
            hcalls: c.hess as i64,
            jprod: (c.jprod + c.jtprod) as i64,
            cnorm: solver.cnorm.unwrap_or(-1.0),
            gl_norm: solver.gl_norm.unwrap_or(-1.0),
            tsolve: solver.tsolve.unwrap_or(-1.0),
        };
        if solver.status == Status::Optimal {
            stats
        } else {
            let neg = |v: Option<f64>| v.map_or(-1.0, |v| -v);
            SolveStats {
                iter: -stats.iter,
                fcalls: -stats.fcalls,
                gcalls: -stats.gcalls,
                hcalls: -stats.hcalls,
                jprod: -stats.jprod,
                cnorm: neg(solver.cnorm),
                gl_norm: neg(solver.gl_norm),
                tsolve: neg(solver.tsolve),
            }
        }
    }
}

pub fn header() -> String {
    format!(
        "{:>12} {:>5} {:>5} {:>6} {:>8} {:>8} {:>8} {:>6} {:>6} {:>6} {:>5} {:>7}",
        "name",
        "nvar",
        "ncons",
        "iter",
        "f",
        "‖c‖",
        "‖∇L‖",
        "#f",
        "#g",
        "#jprod",
        "stat",
        "time"
    )
}

pub fn report_line(
    name: &str,
    nvar: usize,
    ncons: usize,
    f: f64,
    stats: &SolveStats,
    status: &str,
) -> String {
    format!(
        "{:>12} {:>5} {:>5} {:>6} {:>8.1e} {:>8.1e} {:>8.1e} {:>6} {:>6} {:>6} {:>5} {:>7.3}",
        name,
        nvar,
        ncons,
        stats.iter,
        f,
        stats.cnorm,
        stats.gl_norm,
        stats.fcalls,
        stats.gcalls,
        stats.jprod,
        status,
        stats.tsolve
    )
}

/// Outcome of one attempted problem.
#[derive(Debug, Clone)]
pub struct ProblemReport {
    pub name: String,
    pub nvar: usize,
    pub ncons: usize,
    pub nlin: usize,
    pub status: String,
    pub stats: SolveStats,
    pub f0: f64,
    pub f: f64,
    pub inner_itn: usize,
    pub jac_evals: usize,
    pub x: Vec<f64>,
    pub line: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Number of problems given.
    pub problems: usize,
    pub attempted: Vec<ProblemReport>,
    /// Problems that failed to load or were rejected.
    pub skipped: Vec<String>,
}

impl BatchReport {
    /// The only problem of a single-problem run, if it was attempted.
    pub fn single(&self) -> Option<&ProblemReport> {
        match (self.problems, self.attempted.as_slice()) {
            (1, [report]) => Some(report),
            _ => None,
        }
    }
}

/// Solve an already loaded and screened model.
pub fn solve_one<E: Evaluator>(model: &mut Model<E>, options: &SolverOptions) -> ProblemReport {
    let mut solver = RegSqp::new(options.clone());
    let status = match solver.solve(model) {
        Ok(s) => s.short().to_string(),
        Err(e) => {
            let msg = e.to_string();
            if msg.is_empty() {
                "xfail".to_string()
            } else {
                msg
            }
        }
    };
    let stats = SolveStats::collect(&solver, model);
    let line = report_line(model.name(), model.n(), model.m(), solver.f, &stats, &status);
    ProblemReport {
        name: model.name().to_string(),
        nvar: model.n(),
        ncons: model.m(),
        nlin: model.nlin(),
        status,
        stats,
        f0: solver.f0,
        f: solver.f,
        inner_itn: solver.inner_itn,
        jac_evals: model.counters().jac,
        x: solver.x,
        line,
    }
}

/// Load, screen and solve each problem, logging the report table.
pub fn run_batch<E, L, D>(
    problems: &[String],
    mut loader: L,
    options: &SolverOptions,
) -> BatchReport
where
    E: Evaluator,
    L: FnMut(&str) -> Result<Model<E>, D>,
    D: fmt::Display,
{
    let mut report = BatchReport {
        problems: problems.len(),
        ..BatchReport::default()
    };
    info!("{}", header());
    for problem in problems {
        let mut model = match loader(problem) {
            Ok(m) => m,
            Err(e) => {
                error!("{}: {}", problem, e);
                report.skipped.push(problem.clone());
                continue;
            }
        };
        if let Err(r) = screen(&model) {
            error!("{}", r);
            report.skipped.push(problem.clone());
            continue;
        }
        let result = solve_one(&mut model, options);
        info!("{}", result.line);
        report.attempted.push(result);
    }
    report
}

/// End-of-run block for a single problem.
pub fn summary(report: &ProblemReport, quasi_newton: bool) -> Vec<String> {
    let s = &report.stats;
    vec![
        "--------------------------------".to_string(),
        "regsqp: End of Execution".to_string(),
        format!("  Problem                      : {}", report.name),
        format!("  Number of variables          : {}", report.nvar),
        format!("  Number of linear constraints : {}", report.nlin),
        format!("  Number of general constraints: {}", report.ncons - report.nlin),
        format!("  Initial/Final Objective      : {}/{}", report.f0, report.f),
        format!("  Number of iterations         : {}", s.iter),
        format!("         inner iterations      : {}", report.inner_itn),
        format!("  Number of function evals     : {}", s.fcalls),
        format!("  Number of gradient evals     : {}", s.gcalls),
        format!(
            "  Number of Jacobian evals     : {}",
            if quasi_newton { 0 } else { report.jac_evals }
        ),
        format!(
            "  Number of Jacobian products  : {}",
            if quasi_newton { s.jprod } else { 0 }
        ),
        format!(
            "  Number of Hessian evals      : {}",
            if quasi_newton { 0 } else { s.hcalls }
        ),
        format!("  Solve time                   : {}s", s.tsolve),
        "--------------------------------".to_string(),
    ]
}
