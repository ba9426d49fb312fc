// Copyright 2018 Paul Scott
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Turning problem arguments into `.nl` stub names.
//!
//! A problem is given either as a stub (`elec` or `elec.nl`) or as an AMPL
//! model file (`elec.mod`, optionally with `elec.dat`). For a model file a
//! small control script is written and passed to the `ampl` translator,
//! which writes `elec.nl` next to the model.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;

use crate::{Error, Result};

/// Default translator executable.
pub const TRANSLATOR: &str = "ampl";

static TEMPLATE_COUNT: AtomicUsize = AtomicUsize::new(0);

fn strip<'a>(name: &'a str, ext: &str) -> &'a str {
    name.strip_suffix(ext).unwrap_or(name)
}

/// Contents of the control script for `model` and optional `data`.
pub fn template_text(model: &str, data: Option<&str>) -> String {
    let model = strip(model, ".mod");
    let mut text = format!("# Template file for {}.\n", model);
    text.push_str("# Automatically generated by nlp_ampl.\n");
    text.push_str(&format!("model {}.mod;\n", model));
    if let Some(data) = data {
        text.push_str(&format!("data  {}.dat;\n", strip(data, ".dat")));
    }
    text.push_str(&format!("write g{};\n", model));
    text
}

/// Write the control script to a fresh file in the temporary directory.
pub fn write_template(model: &str, data: Option<&str>) -> Result<PathBuf> {
    let path = std::env::temp_dir().join(format!(
        "nlp_ampl-{}-{}.run",
        std::process::id(),
        TEMPLATE_COUNT.fetch_add(1, Ordering::SeqCst)
    ));
    fs::write(&path, template_text(model, data)).map_err(|source| Error::Template {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Run `translator` on a control script.
pub fn translate(translator: &str, template: &Path) -> Result<()> {
    debug!("{} {}", translator, template.display());
    let status = Command::new(translator)
        .arg(template)
        .status()
        .map_err(|source| Error::Spawn {
            command: translator.to_string(),
            source,
        })?;
    if !status.success() {
        return Err(Error::Translator {
            command: translator.to_string(),
            status,
        });
    }
    Ok(())
}

/// Stub name for `problem`, generating the `.nl` file first if `problem` is
/// a model file.
pub fn prepare(problem: &str, data: Option<&str>) -> Result<String> {
    prepare_with(TRANSLATOR, problem, data)
}

/// As [`prepare`] with a specific translator executable.
pub fn prepare_with(translator: &str, problem: &str, data: Option<&str>) -> Result<String> {
    if let Some(stub) = problem.strip_suffix(".mod") {
        let template = write_template(problem, data)?;
        let result = translate(translator, &template);
        // The script is not needed once translation has run.
        let _ = fs::remove_file(&template);
        result?;
        Ok(stub.to_string())
    } else {
        Ok(strip(problem, ".nl").to_string())
    }
}

/// Display name of a problem: its file name without `.nl`.
pub fn problem_name(problem: &str) -> String {
    let base = Path::new(problem)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(problem);
    strip(base, ".nl").to_string()
}
