// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use clap::Parser;
use log::{info, LevelFilter};

use nlp_regsqp::driver;
use nlp_regsqp::SolverOptions;

/// Regularized SQP method for equality-constrained problems. By default,
/// exact second derivatives are used.
#[derive(Parser, Debug)]
#[command(name = "regsqp", version)]
struct Cli {
    /// Absolute stopping tolerance
    #[arg(short, long, default_value_t = 1e-7)]
    abstol: f64,

    /// Relative stopping tolerance
    #[arg(short, long, default_value_t = 1e-6)]
    reltol: f64,

    /// Sufficient improvement factor in outer iterations
    #[arg(short, long, default_value_t = 0.99)]
    theta: f64,

    /// Quasi-Newton memory
    #[arg(short = 'p', long = "pairs", default_value_t = 6)]
    npairs: usize,

    /// Use L-BFGS approximations of second derivatives
    #[arg(short, long)]
    quasi_newton: bool,

    /// Maximum number of iterations
    #[arg(short = 'i', long = "iter", default_value_t = 1000)]
    maxiter: usize,

    /// Data file for problems given as .mod files
    #[arg(long)]
    data: Option<String>,

    /// Problems, as .nl stubs or .mod files
    #[arg(required = true)]
    problems: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let solver_level = if cli.problems.len() > 1 {
        LevelFilter::Warn
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("nlp_regsqp::solver", solver_level)
        .parse_default_env()
        .init();

    let options = SolverOptions {
        abstol: cli.abstol,
        reltol: cli.reltol,
        theta: cli.theta,
        maxiter: cli.maxiter,
        npairs: cli.npairs,
        quasi_newton: cli.quasi_newton,
    };

    let data = cli.data.as_deref();
    let report = driver::run_batch(&cli.problems, |p| nlp_ampl::open(p, data), &options);

    if let Some(single) = report.single() {
        println!("{:?}", single.x);
        for line in driver::summary(single, cli.quasi_newton) {
            info!("{}", line);
        }
    }
}
