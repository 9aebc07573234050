// src/config/build.rs

//! Turning a validated config into a populated [`Pipeline`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::model::{ConfigFile, DatasetConfig, KindConfig, ParamConfig};
use crate::dataset::DatasetSpec;
use crate::errors::{PipebuildError, Result};
use crate::fs::FileSystem;
use crate::pipeline::Pipeline;
use crate::task::kind::INPUT_OUTPUT_KIND;
use crate::task::{Param, Params, ShellCommand, TaskKind};

/// Register the config's datasets and tasks in a fresh pipeline.
///
/// Original-file parameters are resolved in task order, so a missing
/// mandatory input aborts here and a missing optional one is marked invalid
/// for the script emitter.
pub fn build_pipeline(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new(fs);

    for (name, ds) in cfg.dataset.iter() {
        let id = pipeline.add_dataset(name.clone(), dataset_spec(ds))?;
        for partial in ds.mandatory.iter() {
            pipeline.dataset_mut(id).declare_mandatory(partial)?;
        }
    }

    let kinds = build_kinds(&cfg.kind)?;

    for task in cfg.task.iter() {
        let kind = kinds
            .get(task.kind.as_str())
            .cloned()
            .ok_or_else(|| PipebuildError::UnknownKind(task.kind.clone()))?;

        let mut params = Params::new();
        for (name, value) in task.params.iter() {
            params.insert(name.clone(), resolve_param(&mut pipeline, value)?);
        }

        let idx = pipeline.add_task(kind, task.comment.clone(), params)?;
        let registered = pipeline.task_mut(idx);
        if task.skip {
            registered.set_skip(true);
        }
        if task.clobber {
            registered.set_clobber(true);
        }
    }

    debug!(
        datasets = pipeline.datasets().len(),
        tasks = pipeline.tasks().len(),
        "built pipeline from config"
    );
    Ok(pipeline)
}

fn dataset_spec(ds: &DatasetConfig) -> DatasetSpec {
    let mut spec = DatasetSpec::new(ds.base_dir.clone(), ds.original.clone());
    if let Some(ref processing) = ds.processing {
        spec = spec.processing(processing.clone());
    }
    if let Some(ref log) = ds.log {
        spec = spec.log(log.clone());
    }
    if let Some(ref extension) = ds.default_extension {
        spec = spec.default_extension(extension.clone());
    }
    spec
}

fn build_kinds(configs: &BTreeMap<String, KindConfig>) -> Result<BTreeMap<String, Arc<dyn TaskKind>>> {
    let mut kinds: BTreeMap<String, Arc<dyn TaskKind>> = BTreeMap::new();
    kinds.insert(
        INPUT_OUTPUT_KIND.to_string(),
        Arc::new(ShellCommand::input_output()?),
    );

    for (name, kc) in configs.iter() {
        let mut kind = ShellCommand::new(name.clone(), &kc.command)?
            .describe(kc.description.clone())
            .non_file(kc.non_file.iter().cloned());
        if !kc.outputs.is_empty() {
            kind = kind.outputs_from(kc.outputs.iter().cloned());
        }
        if let Some(ref exempt) = kc.grouping_exempt {
            kind = kind.grouping_exempt(exempt.clone());
        }
        for (param, value) in kc.defaults.iter() {
            kind = kind.default_param(param.clone(), literal_param(value)?);
        }
        kinds.insert(name.clone(), Arc::new(kind));
    }
    Ok(kinds)
}

/// Convert a config value, resolving dataset references to file paths.
pub fn resolve_param(pipeline: &mut Pipeline, value: &ParamConfig) -> Result<Param> {
    Ok(match value {
        ParamConfig::Original { original, fields } => {
            let id = pipeline
                .dataset_by_name(original)
                .ok_or_else(|| PipebuildError::UnknownDataset(original.clone()))?;
            Param::File(pipeline.dataset_mut(id).resolve_original(fields)?)
        }
        ParamConfig::Processing { processing, fields } => {
            let id = pipeline
                .dataset_by_name(processing)
                .ok_or_else(|| PipebuildError::UnknownDataset(processing.clone()))?;
            Param::File(pipeline.dataset(id).resolve_output(fields)?)
        }
        ParamConfig::List(items) => Param::List(
            items
                .iter()
                .map(|item| resolve_param(pipeline, item))
                .collect::<Result<Vec<_>>>()?,
        ),
        other => literal_param(other)?,
    })
}

/// Convert a value that must not refer to a dataset (kind defaults).
fn literal_param(value: &ParamConfig) -> Result<Param> {
    Ok(match value {
        ParamConfig::Bool(b) => Param::Bool(*b),
        ParamConfig::Int(i) => Param::Int(*i),
        ParamConfig::Float(f) => Param::Float(*f),
        ParamConfig::Text(s) => Param::Text(s.clone()),
        ParamConfig::File { file } => Param::File(file.clone()),
        ParamConfig::List(items) => Param::List(
            items
                .iter()
                .map(literal_param)
                .collect::<Result<Vec<_>>>()?,
        ),
        ParamConfig::Original { original: name, .. }
        | ParamConfig::Processing { processing: name, .. } => {
            return Err(PipebuildError::ConfigError(format!(
                "dataset reference to '{name}' is not allowed here"
            )));
        }
    })
}
