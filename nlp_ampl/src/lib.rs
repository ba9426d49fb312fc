// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! AMPL models for `nlp`.
//!
//! With the `asl` feature this contains the bindings to `libamplmodel` and
//! an implementation of `nlp::Evaluator` on top of them. Stub preparation
//! (running the `ampl` translator on `.mod` files) is always available.
//!
//! ```no_run
//! # #[cfg(feature = "asl")]
//! # fn main() -> Result<(), nlp_ampl::Error> {
//! let mut model = nlp_ampl::open("hs006.nl", None)?;
//! let x0 = model.x0().to_vec();
//! let f = model.objective(&x0, 0)?;
//! println!("{}: f(x0) = {}", model.name(), f);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "asl"))]
//! # fn main() {}
//! ```

#[cfg(feature = "asl")]
mod asl;
#[cfg(feature = "asl")]
mod ffi;
pub mod stub;

#[cfg(feature = "asl")]
pub use crate::asl::AslEvaluator;

use std::path::PathBuf;
use std::process::ExitStatus;

use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum Error {
    /// The native library could not load the stub.
    #[snafu(display("Cannot initialize model {}", stub))]
    Construction { stub: String },
    #[snafu(display("Cannot write template {}: {}", path.display(), source))]
    Template {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Cannot run {}: {}", command, source))]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[snafu(display("{} exited with {}", command, status))]
    Translator { command: String, status: ExitStatus },
    #[snafu(context(false), display("{}", source))]
    Model { source: nlp::Error },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Load `problem` as a model, translating it first if it is a `.mod` file.
#[cfg(feature = "asl")]
pub fn open(problem: &str, data: Option<&str>) -> Result<nlp::Model<AslEvaluator>> {
    let stub = stub::prepare(problem, data)?;
    let evaluator = AslEvaluator::open(&stub)?;
    Ok(nlp::Model::new(evaluator, stub::problem_name(&stub)))
}
