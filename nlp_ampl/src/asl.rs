// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::ffi::CString;

use nlp::evaluator::{Evaluator, ProblemInfo};
use nlp::sparse::{SparseVector, Triple};

use crate::ffi;
use crate::{Error, Result};

fn failed(call: &str, code: ffi::Index) -> nlp::Error {
    nlp::Error::Evaluation {
        message: format!("{} failed with code {}", call, code),
    }
}

/// Map a status or count returned by the library to a Rust result.
fn status(call: &str, code: ffi::Index) -> nlp::Result<usize> {
    if code < 0 {
        Err(failed(call, code))
    } else {
        Ok(code as usize)
    }
}

/// The library reads exactly `expected` values through every input pointer.
fn check_len(what: &'static str, v: &[f64], expected: usize) -> nlp::Result<()> {
    if v.len() == expected {
        Ok(())
    } else {
        Err(nlp::Error::Dimension {
            what,
            expected,
            got: v.len(),
        })
    }
}

fn fill(
    len: usize,
    get: unsafe extern "C" fn(*const ffi::AslModel, *mut f64),
    asl: *const ffi::AslModel,
) -> Vec<f64> {
    let mut out = vec![0.0; len];
    unsafe { get(asl, out.as_mut_ptr()) };
    out
}

/// Evaluator backed by an AMPL stub loaded through `libamplmodel`.
///
/// The native model is freed when this is dropped, so this type must never
/// be `Clone` or `Copy`.
pub struct AslEvaluator {
    asl: *mut ffi::AslModel,
    info: ProblemInfo,
}

impl AslEvaluator {
    /// Load `stub.nl`.
    pub fn open(stub: &str) -> Result<Self> {
        let c_stub = CString::new(stub).map_err(|_| Error::Construction {
            stub: stub.to_string(),
        })?;
        let asl = unsafe { ffi::asl_open(c_stub.as_ptr()) };
        if asl.is_null() {
            return Err(Error::Construction {
                stub: stub.to_string(),
            });
        }

        let (n, m) = unsafe { (ffi::asl_n_var(asl) as usize, ffi::asl_n_con(asl) as usize) };
        let info = unsafe {
            ProblemInfo {
                n_var: n,
                n_con: m,
                n_obj: ffi::asl_n_obj(asl) as usize,
                minimize: ffi::asl_objtype(asl, 0) == 0,
                x0: fill(n, ffi::asl_get_x0, asl),
                pi0: fill(m, ffi::asl_get_pi0, asl),
                lvar: fill(n, ffi::asl_get_lvar, asl),
                uvar: fill(n, ffi::asl_get_uvar, asl),
                lcon: fill(m, ffi::asl_get_lcon, asl),
                ucon: fill(m, ffi::asl_get_ucon, asl),
                nlo: ffi::asl_nlo(asl) as usize,
                nlc: ffi::asl_nlc(asl) as usize,
                nlnc: ffi::asl_nlnc(asl) as usize,
                nnzj: ffi::asl_nnzj(asl) as usize,
                nnzh: ffi::asl_nnzh(asl) as usize,
            }
        };
        Ok(AslEvaluator { asl, info })
    }

    fn check_x(&self, x: &[f64]) -> nlp::Result<()> {
        check_len("x", x, self.info.n_var)
    }

    fn check_obj(&self, obj_num: usize) -> nlp::Result<()> {
        if obj_num < self.info.n_obj {
            Ok(())
        } else {
            Err(nlp::Error::ObjectiveIndex {
                index: obj_num,
                count: self.info.n_obj,
            })
        }
    }

    fn check_con(&self, i: usize) -> nlp::Result<()> {
        if i < self.info.n_con {
            Ok(())
        } else {
            Err(nlp::Error::ConstraintIndex {
                index: i,
                count: self.info.n_con,
            })
        }
    }

    fn sparse_vector(
        &mut self,
        call: &str,
        eval: impl FnOnce(*mut ffi::AslModel, *mut ffi::Index, *mut f64) -> ffi::Index,
    ) -> nlp::Result<SparseVector> {
        let n = self.info.n_var;
        let mut idx = vec![0 as ffi::Index; n];
        let mut vals = vec![0.0; n];
        let nnz = status(call, eval(self.asl, idx.as_mut_ptr(), vals.as_mut_ptr()))?;
        Ok(SparseVector::from_pairs(
            n,
            idx.iter()
                .zip(vals.iter())
                .take(nnz)
                .map(|(&i, &v)| (i as usize, v)),
        ))
    }

    fn triple(
        &mut self,
        call: &str,
        cap: usize,
        eval: impl FnOnce(
            *mut ffi::AslModel,
            *mut f64,
            *mut ffi::Index,
            *mut ffi::Index,
        ) -> ffi::Index,
    ) -> nlp::Result<Triple> {
        let mut vals = vec![0.0; cap];
        let mut rows = vec![0 as ffi::Index; cap];
        let mut cols = vec![0 as ffi::Index; cap];
        let nnz = status(
            call,
            eval(self.asl, vals.as_mut_ptr(), rows.as_mut_ptr(), cols.as_mut_ptr()),
        )?;
        let mut t = Triple::with_capacity(nnz);
        for k in 0..nnz.min(cap) {
            t.push(rows[k] as usize, cols[k] as usize, vals[k]);
        }
        Ok(t)
    }
}

impl Drop for AslEvaluator {
    fn drop(&mut self) {
        unsafe { ffi::asl_free(self.asl) };
    }
}

impl Evaluator for AslEvaluator {
    fn info(&self) -> &ProblemInfo {
        &self.info
    }

    fn eval_obj(&mut self, obj_num: usize, x: &[f64]) -> nlp::Result<f64> {
        self.check_obj(obj_num)?;
        self.check_x(x)?;
        let mut f = 0.0;
        let code =
            unsafe { ffi::asl_eval_obj(self.asl, obj_num as ffi::Index, x.as_ptr(), &mut f) };
        status("objval", code)?;
        Ok(f)
    }

    fn grad_obj(&mut self, obj_num: usize, x: &[f64]) -> nlp::Result<Vec<f64>> {
        self.check_obj(obj_num)?;
        self.check_x(x)?;
        let mut g = vec![0.0; self.info.n_var];
        let code = unsafe {
            ffi::asl_grad_obj(self.asl, obj_num as ffi::Index, x.as_ptr(), g.as_mut_ptr())
        };
        status("objgrd", code)?;
        Ok(g)
    }

    fn eval_sgrad(&mut self, x: &[f64]) -> nlp::Result<SparseVector> {
        self.check_x(x)?;
        self.sparse_vector("sgrad", |asl, idx, vals| unsafe {
            ffi::asl_eval_sgrad(asl, x.as_ptr(), idx, vals)
        })
    }

    fn eval_cost(&mut self) -> nlp::Result<SparseVector> {
        self.sparse_vector("cost", |asl, idx, vals| unsafe {
            ffi::asl_eval_cost(asl, idx, vals)
        })
    }

    fn eval_cons(&mut self, x: &[f64]) -> nlp::Result<Vec<f64>> {
        self.check_x(x)?;
        let mut c = vec![0.0; self.info.n_con];
        let code = unsafe { ffi::asl_eval_cons(self.asl, x.as_ptr(), c.as_mut_ptr()) };
        status("conval", code)?;
        Ok(c)
    }

    fn eval_ci(&mut self, i: usize, x: &[f64]) -> nlp::Result<f64> {
        self.check_con(i)?;
        self.check_x(x)?;
        let mut ci = 0.0;
        let code = unsafe { ffi::asl_eval_ci(self.asl, i as ffi::Index, x.as_ptr(), &mut ci) };
        status("conival", code)?;
        Ok(ci)
    }

    fn eval_gi(&mut self, i: usize, x: &[f64]) -> nlp::Result<Vec<f64>> {
        self.check_con(i)?;
        self.check_x(x)?;
        let mut gi = vec![0.0; self.info.n_var];
        let code =
            unsafe { ffi::asl_eval_gi(self.asl, i as ffi::Index, x.as_ptr(), gi.as_mut_ptr()) };
        status("congrd", code)?;
        Ok(gi)
    }

    fn eval_sgi(&mut self, i: usize, x: &[f64]) -> nlp::Result<SparseVector> {
        self.check_con(i)?;
        self.check_x(x)?;
        self.sparse_vector("sgi", |asl, idx, vals| unsafe {
            ffi::asl_eval_sgi(asl, i as ffi::Index, x.as_ptr(), idx, vals)
        })
    }

    fn eval_row(&mut self, i: usize) -> nlp::Result<SparseVector> {
        self.check_con(i)?;
        self.sparse_vector("row", |asl, idx, vals| unsafe {
            ffi::asl_eval_row(asl, i as ffi::Index, idx, vals)
        })
    }

    fn eval_a(&mut self, store_zeros: bool) -> nlp::Result<Triple> {
        let cap = self.info.nnzj;
        self.triple("A", cap, |asl, vals, rows, cols| unsafe {
            ffi::asl_eval_a(asl, store_zeros as ffi::Index, vals, rows, cols)
        })
    }

    fn eval_j(&mut self, x: &[f64], store_zeros: bool) -> nlp::Result<Triple> {
        self.check_x(x)?;
        let cap = self.info.nnzj;
        self.triple("jacval", cap, |asl, vals, rows, cols| unsafe {
            ffi::asl_eval_j(asl, x.as_ptr(), store_zeros as ffi::Index, vals, rows, cols)
        })
    }

    fn eval_h(
        &mut self,
        x: &[f64],
        z: &[f64],
        obj_weight: f64,
        store_zeros: bool,
    ) -> nlp::Result<Triple> {
        self.check_x(x)?;
        check_len("multipliers", z, self.info.n_con)?;
        let cap = self.info.nnzh;
        self.triple("sphes", cap, |asl, vals, rows, cols| unsafe {
            ffi::asl_eval_h(
                asl,
                x.as_ptr(),
                z.as_ptr(),
                obj_weight,
                store_zeros as ffi::Index,
                vals,
                rows,
                cols,
            )
        })
    }

    fn h_prod(&mut self, z: &[f64], v: &[f64], obj_weight: f64) -> nlp::Result<Vec<f64>> {
        check_len("multipliers", z, self.info.n_con)?;
        check_len("v", v, self.info.n_var)?;
        let mut hv = vec![0.0; self.info.n_var];
        let code = unsafe {
            ffi::asl_h_prod(self.asl, z.as_ptr(), v.as_ptr(), obj_weight, hv.as_mut_ptr())
        };
        status("hvcomp", code)?;
        Ok(hv)
    }

    fn ghi_prod(&mut self, x: &[f64], g: &[f64], v: &[f64]) -> nlp::Result<Vec<f64>> {
        self.check_x(x)?;
        check_len("g", g, self.info.n_var)?;
        check_len("v", v, self.info.n_var)?;
        let mut ghi = vec![0.0; self.info.n_con];
        let code = unsafe {
            ffi::asl_ghi_prod(self.asl, x.as_ptr(), g.as_ptr(), v.as_ptr(), ghi.as_mut_ptr())
        };
        status("ghi_prod", code)?;
        Ok(ghi)
    }

    fn set_x(&mut self, x: &[f64]) -> nlp::Result<()> {
        self.check_x(x)?;
        let code = unsafe { ffi::asl_set_x(self.asl, x.as_ptr()) };
        status("xknown", code).map(|_| ())
    }

    fn unset_x(&mut self) -> nlp::Result<()> {
        let code = unsafe { ffi::asl_unset_x(self.asl) };
        status("xunknown", code).map(|_| ())
    }

    fn write_sol(&mut self, x: &[f64], z: &[f64], msg: &str) -> nlp::Result<()> {
        self.check_x(x)?;
        check_len("multipliers", z, self.info.n_con)?;
        let c_msg = CString::new(msg).map_err(|_| nlp::Error::Evaluation {
            message: "solution message contains a nul byte".to_string(),
        })?;
        let code =
            unsafe { ffi::asl_write_sol(self.asl, c_msg.as_ptr(), x.as_ptr(), z.as_ptr()) };
        status("write_sol", code).map(|_| ())
    }
}
