//! Provenance records written next to every table the CLI produces.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Command;

/// What produced an output: code revision, library version, run parameters and input files.
pub struct Sidecar {
    code_rev: String,
    params: Value,
    inputs: Vec<String>,
}

impl Sidecar {
    /// Captures the code revision once, at construction.
    pub fn new(params: Value) -> Self {
        Self {
            code_rev: code_revision(),
            params,
            inputs: Vec::new(),
        }
    }

    pub fn with_input<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inputs.push(path.as_ref().display().to_string());
        self
    }

    pub fn code_rev(&self) -> &str {
        &self.code_rev
    }

    /// The JSON document without callsite, listing `outputs`.
    pub fn document(&self, outputs: &[&Path]) -> Value {
        let outputs: Vec<String> = outputs.iter().map(|p| p.display().to_string()).collect();
        json!({
            "code_rev": self.code_rev,
            "windgrid_version": windgrid::VERSION,
            "params": self.params,
            "inputs": self.inputs,
            "outputs": outputs,
        })
    }

    /// Write `<stem>.provenance.json` beside `table` and return its path.
    #[track_caller]
    pub fn write<P: AsRef<Path>>(&self, table: P) -> Result<PathBuf> {
        let table = table.as_ref();
        let caller = Location::caller();
        let mut doc = self.document(&[table]);
        doc["callsite"] = json!({ "file": caller.file(), "line": caller.line() });

        let dest = sidecar_path(table);
        if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        fs::write(&dest, serde_json::to_vec_pretty(&doc)?)
            .with_context(|| format!("writing {}", dest.display()))?;
        tracing::debug!(sidecar = %dest.display(), "provenance written");
        Ok(dest)
    }
}

fn sidecar_path(table: &Path) -> PathBuf {
    let stem = table.file_stem().map_or_else(
        || "output".to_string(),
        |s| s.to_string_lossy().into_owned(),
    );
    table.with_file_name(format!("{stem}.provenance.json"))
}

/// `GIT_COMMIT` (build time, then run time), else `git rev-parse HEAD`, else "unknown".
fn code_revision() -> String {
    let from_env = option_env!("GIT_COMMIT")
        .map(str::to_string)
        .into_iter()
        .chain(std::env::var("GIT_COMMIT").ok())
        .find(|rev| !rev.is_empty());
    if let Some(rev) = from_env {
        return rev;
    }
    let git = Command::new("git").args(["rev-parse", "HEAD"]).output();
    match git {
        Ok(out) if out.status.success() => String::from_utf8(out.stdout)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "unknown".to_string()),
        _ => "unknown".to_string(),
    }
}
