// src/emit/script.rs

//! Shell script generation.
//!
//! Tasks are written in registration order, never reordered by the graph.
//! Each task gets exactly one block, decided in this order:
//!
//! 1. `skip` set → commented-out skip marker;
//! 2. outputs already present (and not clobbering) → commented-out marker;
//! 3. an input is invalid in a selected dataset → commented-out marker, and
//!    the task's own outputs are invalidated so dependents are skipped too;
//! 4. otherwise → `# <comment>` followed by the command.
//!
//! Re-running against a filesystem where some outputs now exist turns those
//! tasks into case 2 without touching the rest.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::emit::command_hash;
use crate::errors::{PipebuildError, Result};
use crate::pipeline::{DatasetId, Pipeline};
use crate::task::{Task, TaskId};

pub const SCRIPT_HEADER: &str = "#!/usr/bin/env bash\nset -e\n\n";

/// Subdirectory (next to the script) holding per-command metadata.
pub const METADATA_DIR: &str = "pb_metadata";

/// What the script does with a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    SkippedByUser,
    AlreadyPresent,
    MissingInput,
    Run,
}

impl Disposition {
    fn marker(self) -> Option<&'static str> {
        match self {
            Disposition::SkippedByUser => Some("# *** Skipping (due to user instructions) "),
            Disposition::AlreadyPresent => Some("# *** Skipping (due to already-present output) "),
            Disposition::MissingInput => Some("# *** Skipping (due to missing input) "),
            Disposition::Run => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    /// Re-run every task even if its outputs exist.
    pub clobber_existing_outputs: bool,
    /// Command prefix that captures each command's stdout, stderr and exit
    /// code (e.g. `pipebuild wrap`). It is called as
    /// `<wrapper> <metadata prefix> <command...>`.
    pub wrapper: Option<String>,
}

/// Outcome of one emission.
#[derive(Debug, Clone)]
pub struct ScriptReport {
    pub path: PathBuf,
    /// Disposition of each task, by task index.
    pub dispositions: Vec<Disposition>,
}

impl ScriptReport {
    pub fn disposition_of(&self, task: TaskId) -> Option<Disposition> {
        self.dispositions.get(task).copied()
    }

    pub fn count(&self, disposition: Disposition) -> usize {
        self.dispositions
            .iter()
            .filter(|&&d| d == disposition)
            .count()
    }
}

/// Write the script for every registered task to `command_file` (which must
/// end in `.sh`) and make it executable.
///
/// `datasets` selects the datasets whose invalid-file sets are consulted and
/// updated; with none selected, inputs are never considered missing.
pub fn generate_code(
    pipeline: &mut Pipeline,
    command_file: &Path,
    datasets: &[DatasetId],
    options: &ScriptOptions,
) -> Result<ScriptReport> {
    if command_file.extension().and_then(|e| e.to_str()) != Some("sh") {
        return Err(PipebuildError::InvalidScriptPath(command_file.to_path_buf()));
    }

    let mut script = String::from(SCRIPT_HEADER);
    let mut dispositions = Vec::with_capacity(pipeline.tasks().len());

    for idx in 0..pipeline.tasks().len() {
        let disposition = decide(pipeline, idx, datasets, options);
        let task = pipeline.task(idx);
        debug!(task = idx, ?disposition, comment = %task.comment(), "emitting task");

        match disposition.marker() {
            Some(marker) => {
                script.push_str(&format!("{marker}{}\n\n", one_line(task.comment())));
            }
            None => {
                script.push_str(&format!("# {}\n", one_line(task.comment())));
                if let Some(ref wrapper) = options.wrapper {
                    let prefix = wrap_prefix(command_file, task.command());
                    pipeline
                        .fs()
                        .create_dir_all(prefix.parent().unwrap_or(Path::new(".")))?;
                    script.push_str(&format!("{wrapper} {} \\\n", prefix.display()));
                }
                script.push_str(&format!("{}\n\n", task.command()));
            }
        }

        if disposition == Disposition::MissingInput {
            invalidate_outputs(pipeline, idx, datasets);
        }
        dispositions.push(disposition);
    }

    pipeline.fs().write(command_file, script.as_bytes())?;
    pipeline.fs().set_executable(command_file)?;

    let report = ScriptReport {
        path: command_file.to_path_buf(),
        dispositions,
    };
    info!(
        script = ?command_file,
        run = report.count(Disposition::Run),
        present = report.count(Disposition::AlreadyPresent),
        missing_input = report.count(Disposition::MissingInput),
        skipped = report.count(Disposition::SkippedByUser),
        "wrote pipeline script"
    );
    Ok(report)
}

fn decide(pipeline: &Pipeline, idx: TaskId, datasets: &[DatasetId], options: &ScriptOptions) -> Disposition {
    let task = pipeline.task(idx);
    if task.skip() {
        return Disposition::SkippedByUser;
    }

    let rerun = options.clobber_existing_outputs || task.clobber() || !task.outputs_exist(pipeline.fs());
    if !rerun {
        return Disposition::AlreadyPresent;
    }

    if !datasets.is_empty() && !has_all_valid_inputs(pipeline, task, datasets) {
        warn!(task = idx, comment = %task.comment(), "skipping task with invalid input");
        return Disposition::MissingInput;
    }
    Disposition::Run
}

fn has_all_valid_inputs(pipeline: &Pipeline, task: &Task, datasets: &[DatasetId]) -> bool {
    task.inputs().iter().all(|input| {
        datasets
            .iter()
            .all(|&id| !pipeline.dataset(id).is_invalid(input))
    })
}

fn invalidate_outputs(pipeline: &mut Pipeline, idx: TaskId, datasets: &[DatasetId]) {
    let outputs = pipeline.task(idx).outputs().to_vec();
    for &id in datasets {
        let dataset = pipeline.dataset_mut(id);
        for output in &outputs {
            dataset.invalidate(output.clone());
        }
    }
}

/// `<script dir>/pb_metadata/<command hash>/<script stem>`
pub fn wrap_prefix(command_file: &Path, command: &str) -> PathBuf {
    let dir = command_file.parent().unwrap_or(Path::new(""));
    let stem = command_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(METADATA_DIR).join(command_hash(command)).join(stem)
}

fn one_line(comment: &str) -> String {
    comment.replace(['\n', '\r'], " ")
}
