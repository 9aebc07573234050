// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipebuildError, Result};
use crate::task::kind::INPUT_OUTPUT_KIND;
use crate::template::Template;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipebuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_kinds(cfg)?;
    validate_tasks(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(PipebuildError::ConfigError(
            "config must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.short_id.contains('/') {
        return Err(PipebuildError::ConfigError(format!(
            "[config].short_id must not contain '/' (got '{}')",
            cfg.config.short_id
        )));
    }
    if cfg.config.wrap && cfg.config.wrapper.trim().is_empty() {
        return Err(PipebuildError::ConfigError(
            "[config].wrap is set but [config].wrapper is empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_kinds(cfg: &RawConfigFile) -> Result<()> {
    for (name, kind) in cfg.kind.iter() {
        let template = Template::parse(&kind.command)?;
        for output in kind.outputs.iter() {
            if !template.fields().contains(output) {
                return Err(PipebuildError::ConfigError(format!(
                    "kind '{}' declares output '{}' which its command never uses",
                    name, output
                )));
            }
        }
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (idx, task) in cfg.task.iter().enumerate() {
        if task.kind != INPUT_OUTPUT_KIND && !cfg.kind.contains_key(&task.kind) {
            return Err(PipebuildError::UnknownKind(task.kind.clone()));
        }

        for value in task.params.values() {
            for (dataset, needs_processing) in value.dataset_refs() {
                let Some(ds) = cfg.dataset.get(dataset) else {
                    return Err(PipebuildError::UnknownDataset(dataset.to_string()));
                };
                if needs_processing && ds.processing.is_none() {
                    return Err(PipebuildError::ConfigError(format!(
                        "task #{} ('{}') uses processing files of dataset '{}', which has no processing template",
                        idx, task.comment, dataset
                    )));
                }
            }
        }
    }
    Ok(())
}
