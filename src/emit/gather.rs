// src/emit/gather.rs

//! Aggregating the latest export of several subjects into one JSON file.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::errors::{PipebuildError, Result};
use crate::fs::FileSystem;
use crate::template::Fields;

/// Per-log-folder list of every export written there, one path per line.
pub const JSON_LIST_FILE: &str = "pb_json_list.txt";

/// Last non-empty line of `path`.
pub fn read_last_line(fs: &dyn FileSystem, path: &Path) -> Result<Option<String>> {
    let content = fs.read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .map(str::to_string))
}

/// Collect `{subject: export}` for each subject and write it to `out`.
///
/// `log_folder` maps a subject's fields to its log folder (usually
/// [`Dataset::log_folder`](crate::dataset::Dataset::log_folder)).
/// Subjects whose log folder cannot be resolved from the subject field
/// alone, or that have no list, are skipped. Returns the subjects that were
/// included.
pub fn gather_subject_exports<F>(
    fs: &dyn FileSystem,
    log_folder: F,
    subject_field: &str,
    subjects: &[String],
    out: &Path,
) -> Result<Vec<String>>
where
    F: Fn(&Fields) -> Result<PathBuf>,
{
    if out.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(PipebuildError::ConfigError(format!(
            "gather output must end in .json: {}",
            out.display()
        )));
    }

    let mut all = Map::new();
    for subject in subjects {
        let mut fields = Fields::new();
        fields.insert(subject_field.to_string(), subject.clone());
        let list = match log_folder(&fields) {
            Ok(folder) => folder.join(JSON_LIST_FILE),
            Err(err) => {
                debug!(subject = %subject, error = %err, "log folder unresolved, skipping subject");
                continue;
            }
        };

        if !fs.exists(&list) {
            debug!(subject = %subject, list = ?list, "no export list, skipping subject");
            continue;
        }
        let Some(latest) = read_last_line(fs, &list)? else {
            debug!(subject = %subject, "empty export list, skipping subject");
            continue;
        };

        let export: Value = serde_json::from_str(&fs.read_to_string(Path::new(&latest))?)?;
        all.insert(subject.clone(), export);
    }

    let included: Vec<String> = all.keys().cloned().collect();
    fs.write(out, serde_json::to_string(&Value::Object(all))?.as_bytes())?;
    info!(out = ?out, subjects = included.len(), "gathered subject exports");
    Ok(included)
}
