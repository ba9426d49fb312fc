// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Classification of constraints and variables by their bounds.

/// Bounds at or beyond this magnitude are treated as infinite.
pub const INFINITY: f64 = 1.0e20;

fn finite_lb(l: f64) -> bool {
    l > -INFINITY
}

fn finite_ub(u: f64) -> bool {
    u < INFINITY
}

/// General constraints split by which of their bounds are finite.
///
/// Index sets are disjoint and each is in increasing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintPartition {
    /// `L == U`.
    pub equal: Vec<usize>,
    /// Only `L` finite.
    pub lower: Vec<usize>,
    /// Only `U` finite.
    pub upper: Vec<usize>,
    /// Both finite, `L < U`.
    pub range: Vec<usize>,
    /// Neither finite.
    pub free: Vec<usize>,
}

impl ConstraintPartition {
    pub fn new(lcon: &[f64], ucon: &[f64]) -> Self {
        let mut p = Self::default();
        for (i, (&l, &u)) in lcon.iter().zip(ucon.iter()).enumerate() {
            match (finite_lb(l), finite_ub(u)) {
                (true, true) if l == u => p.equal.push(i),
                (true, true) => p.range.push(i),
                (true, false) => p.lower.push(i),
                (false, true) => p.upper.push(i),
                (false, false) => p.free.push(i),
            }
        }
        p
    }

    /// Number of constraints with at least one inequality side.
    pub fn ninequalities(&self) -> usize {
        self.lower.len() + self.upper.len() + self.range.len()
    }
}

/// Variables split by which of their bounds are finite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundPartition {
    pub fixed: Vec<usize>,
    pub lower: Vec<usize>,
    pub upper: Vec<usize>,
    pub range: Vec<usize>,
    pub free: Vec<usize>,
}

impl BoundPartition {
    pub fn new(lvar: &[f64], uvar: &[f64]) -> Self {
        let mut p = Self::default();
        for (i, (&l, &u)) in lvar.iter().zip(uvar.iter()).enumerate() {
            match (finite_lb(l), finite_ub(u)) {
                (true, true) if l == u => p.fixed.push(i),
                (true, true) => p.range.push(i),
                (true, false) => p.lower.push(i),
                (false, true) => p.upper.push(i),
                (false, false) => p.free.push(i),
            }
        }
        p
    }

    /// Number of variables subject to at least one bound.
    pub fn nbounds(&self) -> usize {
        self.fixed.len() + self.lower.len() + self.upper.len() + self.range.len()
    }
}
