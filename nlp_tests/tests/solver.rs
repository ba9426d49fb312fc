// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use nlp_regsqp::solver::Status;
use nlp_regsqp::{RegSqp, SolverOptions};
use nlp_tests::{assert_near, circle, sphere, tilted};

#[test]
fn exact_second_derivatives() {
    let mut m = circle(vec![0.0, 0.0]);
    let mut s = RegSqp::new(SolverOptions::default());
    assert_eq!(s.solve(&mut m).unwrap(), Status::Optimal);
    assert_eq!(s.short_status(), "opt");
    assert_near!(s.x[0], 0.5, 1e-6);
    assert_near!(s.x[1], 0.5, 1e-6);
    assert_near!(s.y[0], 1.0, 1e-5);
    assert_near!(s.f, 0.5, 1e-6);
    assert_eq!(s.f0, 0.0);
    assert!(s.cnorm.unwrap() <= 1e-6);
    assert!(s.itn > 0 && s.itn < 50);

    let c = m.counters();
    assert!(c.hess > 0);
    assert_eq!(c.jtprod, 0);
}

#[test]
fn quasi_newton() {
    let mut m = circle(vec![2.0, -3.0]);
    let mut s = RegSqp::new(SolverOptions {
        quasi_newton: true,
        ..SolverOptions::default()
    });
    assert_eq!(s.solve(&mut m).unwrap(), Status::Optimal);
    assert_near!(s.x[0], 0.5, 1e-5);
    assert_near!(s.x[1], 0.5, 1e-5);
    assert_near!(s.y[0], 1.0, 1e-4);

    let c = m.counters();
    assert_eq!(c.hess, 0);
    assert!(c.jtprod > 0);
}

#[test]
fn maximization_problem() {
    let mut m = tilted();
    let mut s = RegSqp::new(SolverOptions::default());
    assert_eq!(s.solve(&mut m).unwrap(), Status::Optimal);
    assert_near!(s.x[0], 1.5, 1e-6);
    assert_near!(s.x[1], 1.5, 1e-6);
    // Values are reported for the equivalent minimization.
    assert_near!(s.f, 0.5, 1e-6);
    assert_eq!(s.f0, 5.0);
}

#[test]
fn maximization_with_nonlinear_constraint() {
    let mut min = sphere(true);
    let mut max = sphere(false);
    let mut s = RegSqp::new(SolverOptions::default());
    let mut t = RegSqp::new(SolverOptions::default());
    assert_eq!(s.solve(&mut min).unwrap(), Status::Optimal);
    assert_eq!(t.solve(&mut max).unwrap(), Status::Optimal);

    assert_near!(t.x[0], 1.0, 1e-6);
    assert_near!(t.x[1], 1.0, 1e-6);
    assert_near!(t.y[0], -0.5, 1e-5);
    assert_near!(t.f, -2.0, 1e-6);

    // Both forms see the same Lagrangian Hessian and take the same path.
    assert!(t.itn < 10);
    assert_eq!(t.itn, s.itn);
    assert_eq!(t.inner_itn, s.inner_itn);
    assert_eq!(t.x, s.x);
}

#[test]
fn starting_at_solution() {
    let mut m = circle(vec![0.5, 0.5]);
    let mut s = RegSqp::new(SolverOptions::default());
    s.solve(&mut m).unwrap();
    assert_near!(s.x[0], 0.5, 1e-6);
    assert_near!(s.y[0], 1.0, 1e-5);
    assert_eq!(s.status, Status::Optimal);
}

#[test]
fn iteration_limit_reported() {
    let mut m = circle(vec![0.0, 0.0]);
    let mut s = RegSqp::new(SolverOptions {
        maxiter: 1,
        ..SolverOptions::default()
    });
    assert_eq!(s.solve(&mut m).unwrap(), Status::IterationLimit);
    assert_eq!(s.itn, 1);
    assert_eq!(s.short_status(), "itr");
    assert!(s.tsolve.is_some());
}
