// src/emit/mod.rs

//! Artifacts produced from a pipeline: the shell script, the JSON export and
//! the multi-subject aggregate.

pub mod export;
pub mod gather;
pub mod script;

use std::path::PathBuf;

use chrono::Local;
use tracing::info;

use crate::errors::{PipebuildError, Result};
use crate::pipeline::{DatasetId, Pipeline};

pub use export::{build_export, write_export, PipelineExport};
pub use gather::{gather_subject_exports, read_last_line, JSON_LIST_FILE};
pub use script::{generate_code, Disposition, ScriptOptions, ScriptReport, METADATA_DIR};

/// Stable identifier of a command line, used to name metadata files.
pub fn command_hash(command: &str) -> String {
    blake3::hash(command.as_bytes()).to_hex().to_string()
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub log_folder: PathBuf,
    pub short_id: String,
    /// Write the JSON export next to the script and list it in
    /// [`JSON_LIST_FILE`].
    pub track: bool,
    pub clobber_existing_outputs: bool,
    pub wrapper: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeneratedArtifacts {
    pub script: PathBuf,
    pub export: Option<PathBuf>,
    pub report: ScriptReport,
}

/// Emit a timestamped script `<log_folder>/pb_<short_id>.<timestamp>.sh`,
/// plus its export when tracking.
pub fn generate_from_datasets(
    pipeline: &mut Pipeline,
    datasets: &[DatasetId],
    options: &GenerateOptions,
) -> Result<GeneratedArtifacts> {
    if options.short_id.contains('/') {
        return Err(PipebuildError::ConfigError(format!(
            "short id must not contain '/': {}",
            options.short_id
        )));
    }

    let timestamp = Local::now().format("%y%m%d-%H%M%S-%6f");
    let script = options
        .log_folder
        .join(format!("pb_{}.{timestamp}.sh", options.short_id));

    let export = if options.track {
        let export_path = script.with_extension("json");
        let metadata_path = options.log_folder.join(METADATA_DIR);
        write_export(pipeline, &export_path, &metadata_path)?;

        let list = options.log_folder.join(JSON_LIST_FILE);
        pipeline
            .fs()
            .append(&list, format!("{}\n", export_path.display()).as_bytes())?;
        Some(export_path)
    } else {
        None
    };

    let script_options = ScriptOptions {
        clobber_existing_outputs: options.clobber_existing_outputs,
        wrapper: options.wrapper.clone(),
    };
    let report = generate_code(pipeline, &script, datasets, &script_options)?;
    info!(script = ?script, tracked = options.track, "generated pipeline");

    Ok(GeneratedArtifacts {
        script,
        export,
        report,
    })
}
