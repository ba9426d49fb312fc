// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared problems for the workspace integration tests.

use nlp::closure::{Builder, ClosureEvaluator};
use nlp::model::Model;
use nlp::sparse::Triple;

#[macro_export]
macro_rules! assert_near {
    ( $a:expr, $b:expr, $c:expr ) => {
        assert!(($a - $b).abs() <= $c, "{} is not near {}", $a, $b);
    };
}

/// `f = x0 + x1`, `c = x0 - x1 = 0`, linear objective and constraint.
pub fn sum_builder() -> Builder {
    ClosureEvaluator::builder(2, 1)
        .objective(|x| x[0] + x[1], |_| vec![1.0, 1.0])
        .constraints(
            |x| vec![x[0] - x[1]],
            |_| {
                let mut j = Triple::new();
                j.push(0, 0, 1.0);
                j.push(0, 1, -1.0);
                j
            },
        )
        .nonlinear(0, 0)
}

pub fn sum(minimize: bool) -> Model<ClosureEvaluator> {
    let b = sum_builder();
    let b = if minimize { b } else { b.maximize() };
    Model::new(b.build(), "sum")
}

/// `min x0² + x1² s.t. x0 + x1 = 1`, solution `(0.5, 0.5)` with
/// multiplier 1.
pub fn circle(start: Vec<f64>) -> Model<ClosureEvaluator> {
    let ev = ClosureEvaluator::builder(2, 1)
        .objective(
            |x| x[0] * x[0] + x[1] * x[1],
            |x| vec![2.0 * x[0], 2.0 * x[1]],
        )
        .constraints(
            |x| vec![x[0] + x[1]],
            |_| {
                let mut j = Triple::new();
                j.push(0, 0, 1.0);
                j.push(0, 1, 1.0);
                j
            },
        )
        .hessian(|_, _, w| {
            let mut h = Triple::new();
            h.push(0, 0, 2.0 * w);
            h.push(1, 1, 2.0 * w);
            h
        })
        .constraint_bounds(vec![1.0], vec![1.0])
        .nonlinear(1, 0)
        .start(start)
        .build();
    Model::new(ev, "circle")
}

/// `max -(x0 - 1)² - (x1 - 2)² s.t. x0 - x1 = 0`, solution `(1.5, 1.5)`.
pub fn tilted() -> Model<ClosureEvaluator> {
    let ev = ClosureEvaluator::builder(2, 1)
        .objective(
            |x| -(x[0] - 1.0).powi(2) - (x[1] - 2.0).powi(2),
            |x| vec![-2.0 * (x[0] - 1.0), -2.0 * (x[1] - 2.0)],
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
            h.push(0, 0, -2.0 * w);
            h.push(1, 1, -2.0 * w);
            h
        })
        .maximize()
        .nonlinear(1, 0)
        .build();
    Model::new(ev, "tilted")
}

/// `min -(x0 + x1)`, or `max x0 + x1`, `s.t. x0² + x1² = 2` from `(1.2, 0.8)`.
///
/// Both forms have the solution `(1, 1)`.
pub fn sphere(minimize: bool) -> Model<ClosureEvaluator> {
    let sign = if minimize { -1.0 } else { 1.0 };
    let b = ClosureEvaluator::builder(2, 1)
        .objective(move |x| sign * (x[0] + x[1]), move |_| vec![sign, sign])
        .constraints(
            |x| vec![x[0] * x[0] + x[1] * x[1]],
            |x| {
                let mut j = Triple::new();
                j.push(0, 0, 2.0 * x[0]);
                j.push(0, 1, 2.0 * x[1]);
                j
            },
        )
        .hessian(|_, z, _| {
            let mut h = Triple::new();
            h.push(0, 0, -2.0 * z[0]);
            h.push(1, 1, -2.0 * z[0]);
            h
        })
        .constraint_bounds(vec![2.0], vec![2.0])
        .nonlinear(0, 1)
        .start(vec![1.2, 0.8]);
    let b = if minimize { b } else { b.maximize() };
    Model::new(b.build(), "sphere")
}

/// Three variables and one constraint of each inequality kind:
///
/// ```text
///   c0 = x0 x1 + x2²   in [-1, 3]   (range, nonlinear)
///   c1 = x0 + x1 + x2  >= 0         (lower)
///   c2 = 2 x0 - x2     <= 5         (upper)
///   c3 = x1 - x2       = 1          (equality)
/// ```
///
/// with `f = x0² + x1 x2`.
pub fn mixed() -> Model<ClosureEvaluator> {
    let inf = f64::INFINITY;
    let ev = ClosureEvaluator::builder(3, 4)
        .objective(
            |x| x[0] * x[0] + x[1] * x[2],
            |x| vec![2.0 * x[0], x[2], x[1]],
        )
        .constraints(
            |x| {
                vec![
                    x[0] * x[1] + x[2] * x[2],
                    x[0] + x[1] + x[2],
                    2.0 * x[0] - x[2],
                    x[1] - x[2],
                ]
            },
            |x| {
                let mut j = Triple::new();
                j.push(0, 0, x[1]);
                j.push(0, 1, x[0]);
                j.push(0, 2, 2.0 * x[2]);
                j.push(1, 0, 1.0);
                j.push(1, 1, 1.0);
                j.push(1, 2, 1.0);
                j.push(2, 0, 2.0);
                j.push(2, 2, -1.0);
                j.push(3, 1, 1.0);
                j.push(3, 2, -1.0);
                j
            },
        )
        .hessian(|_, z, w| {
            let mut h = Triple::new();
            h.push(0, 0, 2.0 * w);
            h.push(1, 0, -z[0]);
            h.push(2, 1, w);
            h.push(2, 2, -2.0 * z[0]);
            h
        })
        .constraint_bounds(vec![-1.0, 0.0, -inf, 1.0], vec![3.0, inf, 5.0, 1.0])
        .nonlinear(1, 1)
        .start(vec![1.0, 2.0, 3.0])
        .build();
    Model::new(ev, "mixed")
}
