// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Limited-memory BFGS approximation of the Lagrangian Hessian.

use std::collections::VecDeque;

use log::trace;
use nalgebra::{DMatrix, DVector};

/// Pairs `sᵀy` below this fraction of `‖s‖‖y‖` are rejected.
const CURVATURE_TOL: f64 = 1e-8;

/// Most recent `(s, y)` pairs, oldest first.
#[derive(Debug, Clone)]
pub struct Lbfgs {
    npairs: usize,
    pairs: VecDeque<(DVector<f64>, DVector<f64>)>,
}

impl Lbfgs {
    pub fn new(npairs: usize) -> Self {
        Lbfgs {
            npairs,
            pairs: VecDeque::with_capacity(npairs),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Store a step `s` and gradient change `y`, dropping the oldest pair
    /// when full. Returns false if the pair was skipped for lack of
    /// curvature.
    pub fn update(&mut self, s: &[f64], y: &[f64]) -> bool {
        let s = DVector::from_column_slice(s);
        let y = DVector::from_column_slice(y);
        let sy = s.dot(&y);
        if self.npairs == 0 || sy <= CURVATURE_TOL * s.norm() * y.norm() {
            trace!("Skipping quasi-Newton pair with sᵀy = {:e}", sy);
            return false;
        }
        if self.pairs.len() == self.npairs {
            self.pairs.pop_front();
        }
        self.pairs.push_back((s, y));
        true
    }

    /// Initial scaling `yᵀy / sᵀy` from the newest pair.
    fn gamma(&self) -> f64 {
        self.pairs
            .back()
            .map_or(1.0, |(s, y)| y.dot(y) / s.dot(y))
    }

    /// Dense approximation, built from `γI` by BFGS updates with the stored
    /// pairs.
    pub fn matrix(&self, n: usize) -> DMatrix<f64> {
        let mut b = DMatrix::identity(n, n) * self.gamma();
        for (s, y) in &self.pairs {
            let bs = &b * s;
            let sbs = s.dot(&bs);
            let sy = s.dot(y);
            if sbs <= 0.0 {
                continue;
            }
            b -= &bs * bs.transpose() / sbs;
            b += y * y.transpose() / sy;
        }
        b
    }
}
