// src/exec/wrap.rs

//! Command wrapper invoked from generated scripts.
//!
//! Runs a command, echoes its output, and leaves four files next to the
//! metadata prefix: `<prefix>_summary.json`, `<prefix>_stdout`,
//! `<prefix>_stderr` and `<prefix>_retcode`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::fs::FileSystem;

/// Contents of `<prefix>_summary.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapSummary {
    pub stdout: String,
    pub stderr: String,
    pub retcode: i32,
}

/// Path of one of the wrapper's files for `prefix`, e.g. `_stdout`.
pub fn metadata_file(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Run `argv` and record its outcome under `prefix`.
///
/// Returns the command's exit code (`-1` when it was killed by a signal) so
/// the caller can exit with it and keep `set -e` scripts honest.
pub fn run_wrapped(fs: &dyn FileSystem, prefix: &Path, argv: &[String]) -> Result<i32> {
    let Some((program, args)) = argv.split_first() else {
        bail!("no command given to wrap");
    };

    debug!(prefix = ?prefix, cmd = %argv.join(" "), "running wrapped command");
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("spawning wrapped command '{program}'"))?;

    let summary = WrapSummary {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        retcode: output.status.code().unwrap_or(-1),
    };
    write_metadata(fs, prefix, &summary)?;

    std::io::stdout()
        .write_all(&output.stdout)
        .context("echoing wrapped stdout")?;
    std::io::stderr()
        .write_all(&output.stderr)
        .context("echoing wrapped stderr")?;

    info!(prefix = ?prefix, retcode = summary.retcode, "wrapped command finished");
    Ok(summary.retcode)
}

/// Write the four metadata files for `summary`.
pub fn write_metadata(fs: &dyn FileSystem, prefix: &Path, summary: &WrapSummary) -> Result<()> {
    let json = serde_json::to_string(summary).context("serializing wrap summary")?;
    fs.write(&metadata_file(prefix, "_summary.json"), json.as_bytes())?;
    fs.write(&metadata_file(prefix, "_stdout"), summary.stdout.as_bytes())?;
    fs.write(&metadata_file(prefix, "_stderr"), summary.stderr.as_bytes())?;
    fs.write(
        &metadata_file(prefix, "_retcode"),
        summary.retcode.to_string().as_bytes(),
    )?;
    Ok(())
}
