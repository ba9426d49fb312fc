// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Linear operator view over a coordinate matrix.

use crate::model::{Error, Result};
use crate::sparse::Triple;

/// Matrix-free operator backed by a coordinate triple.
///
/// Maps vectors of length `nargin` to vectors of length `nargout`. The
/// transpose shares the same storage.
#[derive(Debug, Clone)]
pub struct CoordOperator {
    triple: Triple,
    nargin: usize,
    nargout: usize,
    symmetric: bool,
    transposed: bool,
}

impl CoordOperator {
    pub fn new(triple: Triple, nargin: usize, nargout: usize, symmetric: bool) -> Self {
        CoordOperator {
            triple,
            nargin,
            nargout,
            symmetric,
            transposed: false,
        }
    }

    pub fn nargin(&self) -> usize {
        if self.transposed {
            self.nargout
        } else {
            self.nargin
        }
    }

    pub fn nargout(&self) -> usize {
        if self.transposed {
            self.nargin
        } else {
            self.nargout
        }
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// Transposed view.
    pub fn transpose(mut self) -> Self {
        if !self.symmetric {
            self.transposed = !self.transposed;
        }
        self
    }

    /// Apply the operator to `p`.
    pub fn apply(&self, p: &[f64]) -> Result<Vec<f64>> {
        if p.len() != self.nargin() {
            return Err(Error::Dimension {
                what: "operator argument",
                expected: self.nargin(),
                got: p.len(),
            });
        }
        let mut out = vec![0.0; self.nargout()];
        for (r, c, v) in self.triple.iter() {
            let (i, j) = if self.transposed { (c, r) } else { (r, c) };
            if i >= out.len() || j >= p.len() {
                return Err(Error::Operator { row: r, col: c });
            }
            out[i] += v * p[j];
        }
        Ok(out)
    }
}
