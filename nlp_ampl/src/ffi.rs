// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Raw bindings to `libamplmodel`, a thin C layer over the AMPL solver
//! library.
//!
//! All indices are zero based. Evaluation functions return a negative value
//! when the library reports an error. Functions producing sparse output
//! return the number of entries written, and the caller must supply buffers
//! of at least `n` (vectors), `nnzj` (Jacobians) or `nnzh` (Hessians)
//! entries.

use libc::{c_char, c_int};

pub type Number = f64;
pub type Index = c_int;

/// Opaque handle to a loaded stub.
#[repr(C)]
pub struct AslModel {
    _private: [u8; 0],
}

#[link(name = "amplmodel")]
extern "C" {
    /// Read `stub.nl`. Null on failure.
    pub fn asl_open(stub: *const c_char) -> *mut AslModel;
    pub fn asl_free(asl: *mut AslModel);

    pub fn asl_n_var(asl: *const AslModel) -> Index;
    pub fn asl_n_con(asl: *const AslModel) -> Index;
    pub fn asl_n_obj(asl: *const AslModel) -> Index;
    /// 0 for minimization, 1 for maximization.
    pub fn asl_objtype(asl: *const AslModel, obj_num: Index) -> Index;
    pub fn asl_nlo(asl: *const AslModel) -> Index;
    pub fn asl_nlc(asl: *const AslModel) -> Index;
    pub fn asl_nlnc(asl: *const AslModel) -> Index;
    pub fn asl_nnzj(asl: *const AslModel) -> Index;
    pub fn asl_nnzh(asl: *const AslModel) -> Index;

    // Fill arrays of length n_var or n_con.
    pub fn asl_get_x0(asl: *const AslModel, x0: *mut Number);
    pub fn asl_get_pi0(asl: *const AslModel, pi0: *mut Number);
    pub fn asl_get_lvar(asl: *const AslModel, lvar: *mut Number);
    pub fn asl_get_uvar(asl: *const AslModel, uvar: *mut Number);
    pub fn asl_get_lcon(asl: *const AslModel, lcon: *mut Number);
    pub fn asl_get_ucon(asl: *const AslModel, ucon: *mut Number);

    pub fn asl_eval_obj(asl: *mut AslModel, obj_num: Index, x: *const Number, f: *mut Number)
        -> Index;
    pub fn asl_grad_obj(asl: *mut AslModel, obj_num: Index, x: *const Number, g: *mut Number)
        -> Index;
    pub fn asl_eval_sgrad(
        asl: *mut AslModel,
        x: *const Number,
        idx: *mut Index,
        vals: *mut Number,
    ) -> Index;
    pub fn asl_eval_cost(asl: *mut AslModel, idx: *mut Index, vals: *mut Number) -> Index;

    pub fn asl_eval_cons(asl: *mut AslModel, x: *const Number, c: *mut Number) -> Index;
    pub fn asl_eval_ci(asl: *mut AslModel, i: Index, x: *const Number, ci: *mut Number) -> Index;
    pub fn asl_eval_gi(asl: *mut AslModel, i: Index, x: *const Number, gi: *mut Number) -> Index;
    pub fn asl_eval_sgi(
        asl: *mut AslModel,
        i: Index,
        x: *const Number,
        idx: *mut Index,
        vals: *mut Number,
    ) -> Index;
    pub fn asl_eval_row(asl: *mut AslModel, i: Index, idx: *mut Index, vals: *mut Number) -> Index;

    pub fn asl_eval_a(
        asl: *mut AslModel,
        store_zeros: Index,
        vals: *mut Number,
        rows: *mut Index,
        cols: *mut Index,
    ) -> Index;
    pub fn asl_eval_j(
        asl: *mut AslModel,
        x: *const Number,
        store_zeros: Index,
        vals: *mut Number,
        rows: *mut Index,
        cols: *mut Index,
    ) -> Index;
    pub fn asl_eval_h(
        asl: *mut AslModel,
        x: *const Number,
        z: *const Number,
        obj_weight: Number,
        store_zeros: Index,
        vals: *mut Number,
        rows: *mut Index,
        cols: *mut Index,
    ) -> Index;

    /// Hessian-vector product at the last point seen by the library.
    pub fn asl_h_prod(
        asl: *mut AslModel,
        z: *const Number,
        v: *const Number,
        obj_weight: Number,
        hv: *mut Number,
    ) -> Index;
    pub fn asl_ghi_prod(
        asl: *mut AslModel,
        x: *const Number,
        g: *const Number,
        v: *const Number,
        ghi: *mut Number,
    ) -> Index;

    pub fn asl_set_x(asl: *mut AslModel, x: *const Number) -> Index;
    pub fn asl_unset_x(asl: *mut AslModel) -> Index;

    pub fn asl_write_sol(
        asl: *mut AslModel,
        msg: *const c_char,
        x: *const Number,
        z: *const Number,
    ) -> Index;
}
