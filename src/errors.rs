// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipebuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Malformed template '{template}': {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("Template '{template}' needs a value for field '{field}'")]
    MissingField { template: String, field: String },

    #[error("Task kind '{kind}' requires parameter '{param}'")]
    MissingParameter { kind: String, param: String },

    #[error("Missing mandatory file: {0}")]
    MissingMandatoryInput(PathBuf),

    #[error("Dataset rooted at {0:?} has no processing template")]
    NoProcessingTemplate(PathBuf),

    #[error("Mandatory inputs must always fill the same fields (expected {expected:?}, got {got:?})")]
    MandatoryFieldMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("Dataset '{dataset}' has no original field '{field}'")]
    UnknownMandatoryField { dataset: String, field: String },

    #[error("File {path:?} was already resolved from different fields")]
    ConflictingFields { path: PathBuf },

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Unknown task kind: {0}")]
    UnknownKind(String),

    #[error("Command files must end with .sh (got {0:?})")]
    InvalidScriptPath(PathBuf),

    #[error("Cycle detected in dependency graph: {unplaced} task(s) could not be staged, including task {task}")]
    DependencyCycle { unplaced: usize, task: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipebuildError>;
