// src/dataset.rs

//! Datasets: field-based file naming for pipeline inputs and outputs.
//!
//! A dataset ties together three templates rooted at a base directory:
//!
//! - the *original* template, naming files that exist before the pipeline
//!   runs (its inputs),
//! - an optional *processing* template for intermediate and output files,
//! - a *log* template for log folders (defaults to the base directory).
//!
//! Every template implicitly ends with an `{extension}` field.
//!
//! Datasets also carry the pipeline's failure bookkeeping: which original
//! files are mandatory (missing ones abort construction) and which files are
//! invalid (tasks depending on them are skipped in the emitted script).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{PipebuildError, Result};
use crate::fs::FileSystem;
use crate::template::{Fields, Template, WILDCARD};

pub const DEFAULT_EXTENSION: &str = ".nii.gz";

const EXTENSION_FIELD: &str = "extension";

/// Declarative description of a dataset, before its templates are parsed.
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    pub base_dir: PathBuf,
    /// Template for original files. Relative templates are joined to `base_dir`.
    pub original: String,
    /// Template for produced files; `None` if this dataset produces nothing.
    pub processing: Option<String>,
    /// Template for log folders; `None` means `base_dir`.
    pub log: Option<String>,
    pub default_extension: String,
}

impl DatasetSpec {
    pub fn new(base_dir: impl Into<PathBuf>, original: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            original: original.into(),
            processing: None,
            log: None,
            default_extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn processing(mut self, template: impl Into<String>) -> Self {
        self.processing = Some(template.into());
        self
    }

    pub fn log(mut self, template: impl Into<String>) -> Self {
        self.log = Some(template.into());
        self
    }

    pub fn default_extension(mut self, extension: impl Into<String>) -> Self {
        self.default_extension = extension.into();
        self
    }
}

#[derive(Debug)]
pub struct Dataset {
    name: String,
    base_dir: PathBuf,
    default_extension: String,

    original: Template,
    original_fields: Vec<String>,
    processing: Option<Template>,
    processing_fields: Vec<String>,
    log: Template,

    filenames_to_fields: HashMap<PathBuf, Fields>,
    mandatory_files: HashSet<String>,
    /// Field names filled in by every `declare_mandatory` call; `None` until
    /// the first call.
    mandatory_fields: Option<BTreeSet<String>>,
    invalid_files: HashSet<PathBuf>,

    fs: Arc<dyn FileSystem>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, spec: DatasetSpec, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let original = Template::parse(anchor(&spec.base_dir, &with_extension(&spec.original)))?;
        let original_fields = extension_first(original.fields());

        let (processing, processing_fields) = match spec.processing {
            Some(ref raw) => {
                let template = Template::parse(anchor(&spec.base_dir, &with_extension(raw)))?;
                let fields = extension_first(template.fields());
                (Some(template), fields)
            }
            None => (None, Vec::new()),
        };

        let log = match spec.log {
            Some(ref raw) => Template::parse(anchor(&spec.base_dir, raw))?,
            None => Template::parse(spec.base_dir.to_string_lossy())?,
        };

        Ok(Self {
            name: name.into(),
            base_dir: spec.base_dir,
            default_extension: spec.default_extension,
            original,
            original_fields,
            processing,
            processing_fields,
            log,
            filenames_to_fields: HashMap::new(),
            mandatory_files: HashSet::new(),
            mandatory_fields: None,
            invalid_files: HashSet::new(),
            fs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields of the original template (`extension` first).
    pub fn original_fields(&self) -> &[String] {
        &self.original_fields
    }

    /// Fields of the processing template (`extension` first); empty if there
    /// is no processing template.
    pub fn processing_fields(&self) -> &[String] {
        &self.processing_fields
    }

    /// Resolve an original (input) file.
    ///
    /// Fails with [`PipebuildError::MissingMandatoryInput`] if the file is
    /// absent and mandatory. An absent, non-mandatory file is invalidated so
    /// that tasks reading it get skipped, and its path is still returned.
    pub fn resolve_original(&mut self, fields: &Fields) -> Result<PathBuf> {
        let mut fields = fields.clone();
        fields
            .entry(EXTENSION_FIELD.to_string())
            .or_insert_with(|| self.default_extension.clone());

        let path = PathBuf::from(self.original.render(&fields)?);

        if !self.fs.exists(&path) {
            if self.is_mandatory(&fields)? {
                return Err(PipebuildError::MissingMandatoryInput(path));
            }
            debug!(dataset = %self.name, path = ?path, "optional input missing; invalidating");
            self.invalidate(path.clone());
        }

        match self.filenames_to_fields.get(&path) {
            Some(previous) if previous != &fields => {
                Err(PipebuildError::ConflictingFields { path })
            }
            Some(_) => Ok(path),
            None => {
                self.filenames_to_fields.insert(path.clone(), fields);
                Ok(path)
            }
        }
    }

    /// Resolve an intermediate/output file. No existence check.
    pub fn resolve_output(&self, fields: &Fields) -> Result<PathBuf> {
        let template = self.processing_template()?;
        let mut fields = fields.clone();
        fields
            .entry(EXTENSION_FIELD.to_string())
            .or_insert_with(|| self.default_extension.clone());
        Ok(PathBuf::from(template.render(&fields)?))
    }

    /// Folder where a processing file with these (possibly partial) fields
    /// would land. Missing fields are filled with the wildcard.
    pub fn folder(&self, fields: &Fields) -> Result<PathBuf> {
        let template = self.processing_template()?;
        let filled = fill_missing(fields, &self.processing_fields);
        let rendered = PathBuf::from(template.render(&filled)?);
        Ok(rendered
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default())
    }

    pub fn log_folder(&self, fields: &Fields) -> Result<PathBuf> {
        Ok(PathBuf::from(self.log.render(fields)?))
    }

    /// Declare that every original file matching `partial` is mandatory.
    ///
    /// Fields not given are wildcarded: with fields `(subject, feature)`,
    /// `declare_mandatory({feature: "img"})` requires the `img` feature for
    /// every subject. All calls on one dataset must fill the same fields.
    pub fn declare_mandatory(&mut self, partial: &Fields) -> Result<()> {
        let keys: BTreeSet<String> = partial.keys().cloned().collect();
        if let Some(unknown) = keys.iter().find(|k| !self.original_fields.contains(*k)) {
            return Err(PipebuildError::UnknownMandatoryField {
                dataset: self.name.clone(),
                field: unknown.clone(),
            });
        }
        match self.mandatory_fields {
            None => self.mandatory_fields = Some(keys),
            Some(ref expected) if *expected != keys => {
                return Err(PipebuildError::MandatoryFieldMismatch {
                    expected: expected.iter().cloned().collect(),
                    got: keys.into_iter().collect(),
                });
            }
            Some(_) => {}
        }

        let pattern = self
            .original
            .render(&fill_missing(partial, &self.original_fields))?;
        debug!(dataset = %self.name, %pattern, "declared mandatory input");
        self.mandatory_files.insert(pattern);
        Ok(())
    }

    /// Whether the original file named by `fields` is mandatory.
    pub fn is_mandatory(&self, fields: &Fields) -> Result<bool> {
        let Some(ref declared) = self.mandatory_fields else {
            return Ok(false);
        };

        let mut wildcarded = fields.clone();
        for field in &self.original_fields {
            if !declared.contains(field) {
                wildcarded.insert(field.clone(), WILDCARD.to_string());
            }
        }
        let pattern = self.original.render(&wildcarded)?;
        Ok(self.mandatory_files.contains(&pattern))
    }

    /// Whether `path` could have been produced by the original template.
    pub fn is_original_file(&self, path: &Path) -> bool {
        self.original.matches(&path.to_string_lossy())
    }

    /// Fields that were used to resolve `path` through [`Self::resolve_original`].
    pub fn fields_of(&self, path: &Path) -> Option<&Fields> {
        self.filenames_to_fields.get(path)
    }

    pub fn invalidate(&mut self, path: impl Into<PathBuf>) {
        self.invalid_files.insert(path.into());
    }

    pub fn is_invalid(&self, path: &Path) -> bool {
        self.invalid_files.contains(path)
    }

    pub fn invalid_files(&self) -> impl Iterator<Item = &Path> {
        self.invalid_files.iter().map(PathBuf::as_path)
    }

    fn processing_template(&self) -> Result<&Template> {
        self.processing
            .as_ref()
            .ok_or_else(|| PipebuildError::NoProcessingTemplate(self.base_dir.clone()))
    }
}

fn with_extension(template: &str) -> String {
    const EXTENSION: &str = "{extension}";
    if template.ends_with(EXTENSION) {
        template.to_string()
    } else {
        format!("{template}{EXTENSION}")
    }
}

fn anchor(base_dir: &Path, template: &str) -> String {
    base_dir.join(template).to_string_lossy().into_owned()
}

fn extension_first(fields: &[String]) -> Vec<String> {
    let mut out = vec![EXTENSION_FIELD.to_string()];
    out.extend(fields.iter().filter(|f| *f != EXTENSION_FIELD).cloned());
    out
}

fn fill_missing(partial: &Fields, names: &[String]) -> Fields {
    let mut filled = partial.clone();
    for name in names {
        filled
            .entry(name.clone())
            .or_insert_with(|| WILDCARD.to_string());
    }
    filled
}
