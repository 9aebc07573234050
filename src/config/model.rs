// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::template::Fields;

/// Raw configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// log_folder = "/data/logs"
/// short_id = "prep"
///
/// [dataset.raw]
/// base_dir = "/data"
/// original = "{subj}/{modality}"
/// processing = "{subj}/proc/{modality}_{feature}"
/// mandatory = [{ modality = "t1" }]
///
/// [kind.BiasCorrectCommand]
/// command = "N4BiasFieldCorrection -i {input} -o {output}"
///
/// [[task]]
/// kind = "BiasCorrectCommand"
/// comment = "Bias correct s1"
/// params.input = { original = "raw", fields = { subj = "s1", modality = "t1" } }
/// params.output = { processing = "raw", fields = { subj = "s1", modality = "t1", feature = "n4" } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// `[dataset.<name>]` sections.
    #[serde(default)]
    pub dataset: BTreeMap<String, DatasetConfig>,

    /// `[kind.<name>]` sections.
    #[serde(default)]
    pub kind: BTreeMap<String, KindConfig>,

    /// `[[task]]` entries, in registration order.
    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub dataset: BTreeMap<String, DatasetConfig>,
    pub kind: BTreeMap<String, KindConfig>,
    pub task: Vec<TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            dataset: raw.dataset,
            kind: raw.kind,
            task: raw.task,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Where scripts, exports and the export list are written.
    #[serde(default = "default_log_folder")]
    pub log_folder: PathBuf,

    /// Tag embedded in script names (`pb_<short_id>.<timestamp>.sh`).
    #[serde(default)]
    pub short_id: String,

    /// Re-run tasks whose outputs already exist.
    #[serde(default)]
    pub clobber: bool,

    /// Write the JSON export alongside the script.
    #[serde(default = "default_true")]
    pub export: bool,

    /// Prefix each command with the metadata wrapper.
    #[serde(default)]
    pub wrap: bool,

    /// Wrapper command used when `wrap = true`.
    #[serde(default = "default_wrapper")]
    pub wrapper: String,
}

fn default_log_folder() -> PathBuf {
    PathBuf::from("pb_logs")
}

fn default_true() -> bool {
    true
}

fn default_wrapper() -> String {
    "pipebuild wrap".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            log_folder: default_log_folder(),
            short_id: String::new(),
            clobber: false,
            export: default_true(),
            wrap: false,
            wrapper: default_wrapper(),
        }
    }
}

/// `[dataset.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub base_dir: PathBuf,
    pub original: String,
    #[serde(default)]
    pub processing: Option<String>,
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub default_extension: Option<String>,
    /// Partial field sets declared mandatory, all over the same fields.
    #[serde(default)]
    pub mandatory: Vec<Fields>,
}

/// `[kind.<name>]` section: a task kind driven by a command template.
#[derive(Debug, Clone, Deserialize)]
pub struct KindConfig {
    pub command: String,
    #[serde(default)]
    pub description: String,
    /// Parameters holding the kind's outputs. Empty means the `output`
    /// parameter, if any.
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub non_file: Vec<String>,
    #[serde(default)]
    pub grouping_exempt: Option<String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, ParamConfig>,
}

/// `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub kind: String,
    pub comment: String,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub clobber: bool,
    #[serde(default)]
    pub params: BTreeMap<String, ParamConfig>,
}

/// A parameter value as written in TOML.
///
/// Tables refer to files: `{ original = "ds", fields = {...} }` resolves
/// through a dataset's original template, `{ processing = "ds", fields =
/// {...} }` through its processing template, and `{ file = "/abs/path" }`
/// names a file directly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamConfig {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamConfig>),
    Original {
        original: String,
        #[serde(default)]
        fields: Fields,
    },
    Processing {
        processing: String,
        #[serde(default)]
        fields: Fields,
    },
    File {
        file: PathBuf,
    },
}

impl ParamConfig {
    /// Dataset names this value refers to, with whether the processing
    /// template is needed.
    pub fn dataset_refs(&self) -> Vec<(&str, bool)> {
        match self {
            ParamConfig::Original { original, .. } => vec![(original.as_str(), false)],
            ParamConfig::Processing { processing, .. } => vec![(processing.as_str(), true)],
            ParamConfig::List(items) => items.iter().flat_map(ParamConfig::dataset_refs).collect(),
            _ => Vec::new(),
        }
    }
}
