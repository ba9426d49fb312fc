// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sparse containers passed between the evaluator and the model.

use fnv::FnvHashMap;

/// Sparse matrix in coordinate format.
///
/// Entries are stored as parallel `vals`, `rows` and `cols` vectors in
/// whatever order the evaluator produced them. Duplicate coordinates are
/// allowed and are summed by consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triple {
    pub vals: Vec<f64>,
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

impl Triple {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Triple {
            vals: Vec::with_capacity(cap),
            rows: Vec::with_capacity(cap),
            cols: Vec::with_capacity(cap),
        }
    }

    pub fn push(&mut self, row: usize, col: usize, val: f64) {
        self.rows.push(row);
        self.cols.push(col);
        self.vals.push(val);
    }

    /// Number of stored entries (including explicit zeros).
    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .zip(self.cols.iter())
            .zip(self.vals.iter())
            .map(|((&r, &c), &v)| (r, c, v))
    }

    /// Multiply every value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in self.vals.iter_mut() {
            *v *= factor;
        }
    }

    /// Multiply each value by `factors[row]`.
    ///
    /// # Panics
    ///
    /// Expect a panic if a row index is outside `factors`.
    pub fn scale_rows(&mut self, factors: &[f64]) {
        for (v, &r) in self.vals.iter_mut().zip(self.rows.iter()) {
            *v *= factors[r];
        }
    }

    /// Drop entries whose value is exactly zero.
    pub fn drop_zeros(&mut self) {
        let mut out = Triple::with_capacity(self.len());
        for (r, c, v) in self.iter() {
            if v != 0.0 {
                out.push(r, c, v);
            }
        }
        *self = out;
    }

    /// Expand to a dense row-major `nrows` by `ncols` matrix.
    pub fn to_dense(&self, nrows: usize, ncols: usize) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![0.0; ncols]; nrows];
        for (r, c, v) in self.iter() {
            dense[r][c] += v;
        }
        dense
    }
}

/// Sparse vector of fixed dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    n: usize,
    values: FnvHashMap<usize, f64>,
}

impl SparseVector {
    pub fn new(n: usize) -> Self {
        SparseVector {
            n,
            values: FnvHashMap::default(),
        }
    }

    /// Build from `(index, value)` pairs. Repeated indices are summed.
    pub fn from_pairs<I>(n: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut sv = Self::new(n);
        for (i, v) in pairs {
            *sv.values.entry(i).or_insert(0.0) += v;
        }
        sv
    }

    /// Build from a dense slice, keeping only nonzero entries.
    pub fn from_dense(dense: &[f64]) -> Self {
        Self::from_pairs(
            dense.len(),
            dense
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v != 0.0)
                .map(|(i, &v)| (i, v)),
        )
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Value at `i`, zero if not stored.
    pub fn get(&self, i: usize) -> f64 {
        self.values.get(&i).cloned().unwrap_or(0.0)
    }

    pub fn scale(&mut self, factor: f64) {
        for v in self.values.values_mut() {
            *v *= factor;
        }
    }

    /// Stored entries sorted by index.
    pub fn entries(&self) -> Vec<(usize, f64)> {
        let mut es: Vec<(usize, f64)> = self.values.iter().map(|(&i, &v)| (i, v)).collect();
        es.sort_by_key(|&(i, _)| i);
        es
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.n];
        for (&i, &v) in &self.values {
            dense[i] = v;
        }
        dense
    }
}
