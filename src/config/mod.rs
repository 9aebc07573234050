// src/config/mod.rs

//! Pipeline descriptions in TOML.
//!
//! - [`model`] holds the serde types.
//! - [`loader`] reads files.
//! - [`validate`] implements `TryFrom<RawConfigFile> for ConfigFile`.
//! - [`build`] registers datasets and tasks in a [`Pipeline`](crate::pipeline::Pipeline).

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::build_pipeline;
pub use loader::{load_and_validate, load_from_path, parse_str, DEFAULT_CONFIG_FILE};
pub use model::{ConfigFile, ConfigSection, DatasetConfig, KindConfig, ParamConfig, RawConfigFile, TaskConfig};
