#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use pipebuild::config::{
    ConfigFile, ConfigSection, DatasetConfig, KindConfig, ParamConfig, RawConfigFile, TaskConfig,
};
use pipebuild::fs::mock::MockFileSystem;
use pipebuild::pipeline::Pipeline;
use pipebuild::task::{Params, ShellCommand, TaskId, TaskKind};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                dataset: BTreeMap::new(),
                kind: BTreeMap::new(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_dataset(mut self, name: &str, dataset: DatasetConfig) -> Self {
        self.config.dataset.insert(name.to_string(), dataset);
        self
    }

    pub fn with_kind(mut self, name: &str, command: &str) -> Self {
        self.config.kind.insert(name.to_string(), kind_config(command));
        self
    }

    pub fn with_kind_config(mut self, name: &str, kind: KindConfig) -> Self {
        self.config.kind.insert(name.to_string(), kind);
        self
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn log_folder(mut self, folder: &str) -> Self {
        self.config.config.log_folder = PathBuf::from(folder);
        self
    }

    pub fn short_id(mut self, id: &str) -> Self {
        self.config.config.short_id = id.to_string();
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `[dataset.<name>]` with only the required templates.
pub fn dataset_config(base_dir: &str, original: &str, processing: Option<&str>) -> DatasetConfig {
    DatasetConfig {
        base_dir: PathBuf::from(base_dir),
        original: original.to_string(),
        processing: processing.map(str::to_string),
        log: None,
        default_extension: None,
        mandatory: Vec::new(),
    }
}

pub fn kind_config(command: &str) -> KindConfig {
    KindConfig {
        command: command.to_string(),
        description: String::new(),
        outputs: Vec::new(),
        non_file: Vec::new(),
        grouping_exempt: None,
        defaults: BTreeMap::new(),
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(kind: &str, comment: &str) -> Self {
        Self {
            task: TaskConfig {
                kind: kind.to_string(),
                comment: comment.to_string(),
                skip: false,
                clobber: false,
                params: BTreeMap::new(),
            },
        }
    }

    pub fn param(mut self, name: &str, value: ParamConfig) -> Self {
        self.task.params.insert(name.to_string(), value);
        self
    }

    pub fn text(self, name: &str, value: &str) -> Self {
        self.param(name, ParamConfig::Text(value.to_string()))
    }

    pub fn original(self, name: &str, dataset: &str, fields: &[(&str, &str)]) -> Self {
        self.param(
            name,
            ParamConfig::Original {
                original: dataset.to_string(),
                fields: to_fields(fields),
            },
        )
    }

    pub fn processing(self, name: &str, dataset: &str, fields: &[(&str, &str)]) -> Self {
        self.param(
            name,
            ParamConfig::Processing {
                processing: dataset.to_string(),
                fields: to_fields(fields),
            },
        )
    }

    pub fn skip(mut self, val: bool) -> Self {
        self.task.skip = val;
        self
    }

    pub fn clobber(mut self, val: bool) -> Self {
        self.task.clobber = val;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

fn to_fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Empty pipeline over an in-memory filesystem; the returned handle shares
/// the pipeline's files.
pub fn mock_pipeline() -> (Pipeline, MockFileSystem) {
    let fs = MockFileSystem::new();
    let pipeline = Pipeline::new(Arc::new(fs.clone()));
    (pipeline, fs)
}

/// `cp`-style kind: `cmd {input} {output}`.
pub fn copy_kind(name: &str) -> Arc<dyn TaskKind> {
    Arc::new(ShellCommand::new(name, "cp {input} {output}").expect("valid copy template"))
}

/// Register a one-input, one-output task.
pub fn add_io_task(
    pipeline: &mut Pipeline,
    kind: &Arc<dyn TaskKind>,
    comment: &str,
    input: &str,
    output: &str,
) -> TaskId {
    pipeline
        .add_task(
            Arc::clone(kind),
            comment,
            Params::new()
                .with("input", PathBuf::from(input))
                .with("output", PathBuf::from(output)),
        )
        .expect("task registers")
}
