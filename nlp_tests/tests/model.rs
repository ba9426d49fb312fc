// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use nlp::closure::ClosureEvaluator;
use nlp::model::{Error, Model};
use nlp::sparse::Triple;
use nlp_tests::{assert_near, circle, mixed, sum, sum_builder, tilted};

fn dense_times(t: &Triple, nrows: usize, ncols: usize, v: &[f64], transpose: bool) -> Vec<f64> {
    let d = t.to_dense(nrows, ncols);
    if transpose {
        (0..ncols)
            .map(|c| (0..nrows).map(|r| d[r][c] * v[r]).sum())
            .collect()
    } else {
        d.iter()
            .map(|row| row.iter().zip(v.iter()).map(|(a, b)| a * b).sum())
            .collect()
    }
}

#[test]
fn end_to_end_sign_and_scale() {
    let mut m = sum(true);
    assert_eq!(m.objective(&[1.0, 2.0], 0).unwrap(), 3.0);
    m.set_objective_scaling(Some(2.0));
    assert_eq!(m.objective(&[1.0, 2.0], 0).unwrap(), 6.0);

    let mut m = sum(false);
    assert_eq!(m.objective(&[1.0, 2.0], 0).unwrap(), -3.0);
    assert_eq!(m.gradient(&[1.0, 2.0], 0).unwrap(), vec![-1.0, -1.0]);
    assert_eq!(m.sparse_gradient(&[1.0, 2.0]).unwrap().to_dense(), vec![-1.0, -1.0]);
    assert_eq!(m.cost_vector().unwrap().entries(), vec![(0, -1.0), (1, -1.0)]);
}

#[test]
fn maximization_scaled_then_negated() {
    let mut m = sum(false);
    m.set_objective_scaling(Some(0.5));
    assert_eq!(m.objective(&[1.0, 2.0], 0).unwrap(), -1.5);
    assert_eq!(m.gradient(&[1.0, 2.0], 0).unwrap(), vec![-0.5, -0.5]);
}

#[test]
fn objective_index_out_of_range() {
    let mut m = sum(true);
    assert!(matches!(
        m.objective(&[1.0, 2.0], 1),
        Err(Error::ObjectiveIndex { index: 1, count: 1 })
    ));
    assert!(m.hessian(&[1.0, 2.0], None, 2, 1.0, false).is_err());

    let ev = sum_builder().objectives(2).build();
    let mut m = Model::new(ev, "two");
    assert!(m.objective(&[1.0, 2.0], 1).is_ok());
}

#[test]
fn point_length_checked() {
    let mut m = sum(true);
    assert!(matches!(
        m.objective(&[1.0], 0),
        Err(Error::Dimension {
            expected: 2,
            got: 1,
            ..
        })
    ));
    assert!(m.constraints(&[1.0, 2.0, 3.0]).is_err());
    assert!(m.constraint_value(1, &[1.0, 2.0]).is_err());
}

#[test]
fn constraint_scaling_applies_everywhere() {
    let mut m = mixed();
    let x = [1.0, 2.0, 3.0];
    assert!(matches!(
        m.set_constraint_scaling(Some(vec![1.0, 2.0])),
        Err(Error::ScalingLength {
            expected: 4,
            got: 2
        })
    ));

    m.set_constraint_scaling(Some(vec![2.0, 1.0, 1.0, -1.0])).unwrap();
    assert_eq!(m.constraints(&x).unwrap(), vec![22.0, 6.0, -1.0, 1.0]);
    assert_eq!(m.constraint_value(0, &x).unwrap(), 22.0);
    assert_eq!(m.constraint_gradient_dense(0, &x).unwrap(), vec![4.0, 2.0, 12.0]);
    assert_eq!(
        m.constraint_gradient_sparse(3, &x).unwrap().entries(),
        vec![(1, -1.0), (2, 1.0)]
    );
    let j = m.jacobian(&x, false).unwrap().to_dense(4, 3);
    assert_eq!(j[0], vec![4.0, 2.0, 12.0]);
    assert_eq!(j[3], vec![0.0, -1.0, 1.0]);

    m.set_constraint_scaling(None).unwrap();
    assert_eq!(m.constraints(&x).unwrap(), vec![11.0, 6.0, -1.0, -1.0]);
}

#[test]
fn computed_constraint_scaling() {
    let mut m = mixed();
    // Row 0 gradient at (1, 2, 30) is (2, 1, 60).
    let s = m.compute_constraint_scaling(&[1.0, 2.0, 30.0], 10.0).unwrap().to_vec();
    assert_near!(s[0], 10.0 / 60.0, 1e-15);
    assert_eq!(&s[1..], &[1.0, 1.0, 1.0]);
    assert_eq!(m.constraint_scaling(), Some(&s[..]));
}

#[test]
fn reformulated_jacobian_rows() {
    let mut m = mixed();
    let x = [1.0, 2.0, 3.0];
    let plain = m.jacobian(&x, false).unwrap();
    let j = m.jacobian_reformulated(&x, false).unwrap();
    assert_eq!(j.len(), plain.len() + 3);
    assert_eq!(j.rows.iter().max(), Some(&4));

    let d = j.to_dense(5, 3);
    assert_eq!(d[0], vec![2.0, 1.0, 6.0]);
    assert_eq!(d[1], vec![1.0, 1.0, 1.0]);
    assert_eq!(d[2], vec![-2.0, 0.0, 1.0]);
    assert_eq!(d[3], vec![0.0, 1.0, -1.0]);
    assert_eq!(d[4], vec![-2.0, -1.0, -6.0]);
}

#[test]
fn reformulated_jacobian_without_ranges() {
    let mut m = sum(true);
    assert_eq!(m.nrange(), 0);
    let plain = m.jacobian(&[1.0, 2.0], false).unwrap();
    let j = m.jacobian_reformulated(&[1.0, 2.0], false).unwrap();
    assert_eq!(j, plain);

    // c0 = x0 - x1 <= 3, c1 = x0 + 2 x1 = 1, c2 = x0 x1 <= 4
    let ev = ClosureEvaluator::builder(2, 3)
        .constraints(
            |x| vec![x[0] - x[1], x[0] + 2.0 * x[1], x[0] * x[1]],
            |x| {
                let mut j = Triple::new();
                j.push(0, 0, 1.0);
                j.push(0, 1, -1.0);
                j.push(1, 0, 1.0);
                j.push(1, 1, 2.0);
                j.push(2, 0, x[1]);
                j.push(2, 1, x[0]);
                j
            },
        )
        .constraint_bounds(
            vec![f64::NEG_INFINITY, 1.0, f64::NEG_INFINITY],
            vec![3.0, 1.0, 4.0],
        )
        .build();
    let mut m = Model::new(ev, "upper");
    assert_eq!(m.constraints_partition().upper, vec![0, 2]);
    assert_eq!(m.nrange(), 0);

    let j = m.jacobian_reformulated(&[2.0, 5.0], false).unwrap();
    assert_eq!(j.len(), 6);
    assert!(j.rows.iter().all(|&r| r < 3));
    let d = j.to_dense(3, 2);
    assert_eq!(d[0], vec![-1.0, 1.0]);
    assert_eq!(d[1], vec![1.0, 2.0]);
    assert_eq!(d[2], vec![-5.0, -2.0]);
}

#[test]
fn jacobian_products_match_dense() {
    let mut m = mixed();
    let x = [1.0, 2.0, 3.0];
    let j = m.jacobian(&x, false).unwrap();

    let p = [1.0, -1.0, 2.0, 0.5];
    let jtp = m.jacobian_transpose_vector_product(&x, &p).unwrap();
    assert_eq!(jtp, dense_times(&j, 4, 3, &p, true));
    assert_eq!(jtp, vec![5.0, 0.5, 2.5]);

    let v = [1.0, 0.0, -1.0];
    let jv = m.jacobian_vector_product(&x, &v).unwrap();
    assert_eq!(jv, dense_times(&j, 4, 3, &v, false));

    let op = m.jacobian_operator(&x).unwrap();
    assert_eq!((op.nargin(), op.nargout()), (3, 4));
    assert!(!op.is_symmetric());
    assert!(m.jacobian_vector_product(&x, &p).is_err());

    let c = m.counters();
    assert_eq!((c.jac, c.jprod, c.jtprod), (1, 2, 1));
}

#[test]
fn hessian_without_multipliers() {
    let mut m = mixed();
    let x = [1.0, 2.0, 3.0];
    let none = m.hessian(&x, None, 0, 1.0, true).unwrap();
    let zeros = m.hessian(&x, Some(&[0.0; 4]), 0, 1.0, true).unwrap();
    assert_eq!(none, zeros);
    assert_eq!(m.counters().hess, 2);
    assert!(m.hessian(&x, Some(&[0.0; 3]), 0, 1.0, true).is_err());
}

#[test]
fn hessian_scaling_leaves_multipliers_alone() {
    let mut m = mixed();
    let x = [1.0, 2.0, 3.0];
    m.set_objective_scaling(Some(0.5));
    m.set_constraint_scaling(Some(vec![2.0, 1.0, 1.0, 1.0])).unwrap();
    let z = vec![1.0, 0.0, 0.0, 0.0];
    let h = m.hessian(&x, Some(&z), 0, 1.0, false).unwrap().to_dense(3, 3);
    assert_eq!(z, vec![1.0, 0.0, 0.0, 0.0]);
    assert_eq!(h[0][0], 1.0);
    assert_eq!(h[1][0], -2.0);
    assert_eq!(h[2][1], 0.5);
    assert_eq!(h[2][2], -4.0);
}

#[test]
fn maximization_hessian_negated() {
    let mut m = tilted();
    let h = m.hessian(&[0.0, 0.0], None, 0, 1.0, false).unwrap();
    assert_eq!(h.to_dense(2, 2), vec![vec![2.0, 0.0], vec![0.0, 2.0]]);
    m.objective(&[0.0, 0.0], 0).unwrap();
    let hv = m.hessian_vector_product(&[0.0, 0.0], None, &[1.0, 2.0], 1.0).unwrap();
    assert_eq!(hv, vec![2.0, 4.0]);
}

// f = x0³, so ∇²f = 6 x0.
fn cubic() -> Model<ClosureEvaluator> {
    let ev = ClosureEvaluator::builder(1, 0)
        .objective(|x| x[0].powi(3), |x| vec![3.0 * x[0] * x[0]])
        .hessian(|x, _, w| {
            let mut h = Triple::new();
            h.push(0, 0, 6.0 * x[0] * w);
            h
        })
        .build();
    Model::new(ev, "cubic")
}

#[test]
fn hessian_product_uses_last_evaluated_point() {
    let mut m = cubic();
    m.objective(&[1.0], 0).unwrap();
    // The point passed here only has its length checked.
    let hv = m.hessian_vector_product(&[5.0], None, &[1.0], 1.0).unwrap();
    assert_eq!(hv, vec![6.0]);
    assert!(m.hessian_vector_product(&[5.0, 1.0], None, &[1.0], 1.0).is_err());

    m.gradient(&[5.0], 0).unwrap();
    let hv = m.hessian_vector_product(&[1.0], None, &[1.0], 1.0).unwrap();
    assert_eq!(hv, vec![30.0]);

    m.freeze_point(&[2.0]).unwrap();
    let hv = m.hessian_vector_product(&[7.0], None, &[1.0], 1.0).unwrap();
    assert_eq!(hv, vec![12.0]);
    m.unfreeze_point().unwrap();
    assert_eq!(m.counters().hprod, 3);
}

#[test]
fn constraint_hessian_product() {
    let mut m = mixed();
    m.objective(&[1.0, 2.0, 3.0], 0).unwrap();
    // ∇²c0 = [0 1 0; 1 0 0; 0 0 2]
    let hv = m
        .constraint_hessian_vector_product(&[1.0, 2.0, 3.0], 0, &[1.0, 1.0, 1.0])
        .unwrap();
    assert_eq!(hv, vec![1.0, 1.0, 2.0]);
    let hv = m
        .constraint_hessian_vector_product(&[1.0, 2.0, 3.0], 1, &[1.0, 1.0, 1.0])
        .unwrap();
    assert_eq!(hv, vec![0.0, 0.0, 0.0]);
    assert!(m
        .constraint_hessian_vector_product(&[1.0, 2.0, 3.0], 4, &[1.0, 1.0, 1.0])
        .is_err());
}

#[test]
fn directional_products_skip_linear_models() {
    let mut m = sum(true);
    assert_eq!(m.nnln(), 0);
    let before = m.evaluator().calls();
    let ghi = m
        .directional_hessian_dot_products(&[1.0, 2.0], &[1.0, 1.0], &[1.0, 1.0])
        .unwrap();
    assert_eq!(ghi, vec![0.0]);
    assert_eq!(m.evaluator().calls(), before);
}

#[test]
fn directional_products_scaled() {
    let mut m = mixed();
    m.set_constraint_scaling(Some(vec![3.0, 1.0, 1.0, 1.0])).unwrap();
    let ghi = m
        .directional_hessian_dot_products(&[1.0, 2.0, 3.0], &[1.0, 0.0, 1.0], &[0.0, 1.0, 1.0])
        .unwrap();
    // gᵀ∇²c0 v = (1, 0, 1)·(1, 0, 2) = 3
    assert_eq!(ghi, vec![9.0, 0.0, 0.0, 0.0]);
}

#[test]
fn linear_program_detection() {
    assert!(sum(true).is_linear_program());
    assert!(!mixed().is_linear_program());
    assert!(!circle(vec![0.0, 0.0]).is_linear_program());
    let ev = sum_builder().network(1).build();
    assert!(!Model::new(ev, "net").is_linear_program());
}

#[test]
fn partitions_and_kinds() {
    let m = mixed();
    let p = m.constraints_partition();
    assert_eq!(p.range, vec![0]);
    assert_eq!(p.lower, vec![1]);
    assert_eq!(p.upper, vec![2]);
    assert_eq!(p.equal, vec![3]);
    assert!(p.free.is_empty());
    assert_eq!(m.nbounds(), 0);
    assert_eq!(m.nln(), 0..1);
    assert_eq!(m.lin(), 1..4);
    assert_eq!((m.nnln(), m.nnet(), m.nlin()), (1, 0, 3));
    assert_eq!(m.nnzj(), 10);
    assert_eq!(m.nnzh(), 4);
    m.log_basic_info();
}

#[test]
fn linear_parts() {
    let mut m = mixed();
    let row = m.linear_constraint_row(2).unwrap();
    assert_eq!(row.entries(), vec![(0, 2.0), (2, -1.0)]);
    let a = m.linear_jacobian(false).unwrap();
    assert_eq!(a.len(), 7);
    assert!(a.rows.iter().all(|&r| r >= 1));
    assert!(m.linear_constraint_row(4).is_err());
}

#[test]
fn counters_reset() {
    let mut m = circle(vec![0.0, 0.0]);
    let x = [1.0, 1.0];
    m.objective(&x, 0).unwrap();
    m.objective(&x, 0).unwrap();
    m.gradient(&x, 0).unwrap();
    m.constraints(&x).unwrap();
    m.jacobian(&x, false).unwrap();
    let c = m.counters();
    assert_eq!((c.obj, c.grad, c.cons, c.jac), (2, 1, 1, 1));
    m.reset_counters();
    assert_eq!(m.counters(), nlp::Counters::default());
}

#[test]
fn solution_forwarded() {
    let mut m = circle(vec![0.0, 0.0]);
    m.write_solution(&[0.5, 0.5], &[1.0], "Optimal").unwrap();
    let s = m.evaluator().written_solution().unwrap();
    assert_eq!(s.x, vec![0.5, 0.5]);
    assert_eq!(s.z, vec![1.0]);
    assert_eq!(s.message, "Optimal");
}

#[test]
fn solution_lengths_checked() {
    let mut m = circle(vec![0.0, 0.0]);
    assert!(matches!(
        m.write_solution(&[0.5, 0.5], &[], "Optimal"),
        Err(Error::Dimension {
            expected: 1,
            got: 0,
            ..
        })
    ));
    assert!(matches!(
        m.write_solution(&[], &[1.0], "Optimal"),
        Err(Error::Dimension {
            expected: 2,
            got: 0,
            ..
        })
    ));
    assert!(m.evaluator().written_solution().is_none());
}
