// src/task/mod.rs

//! Tasks: one shell command each, with declared outputs and inferred inputs.
//!
//! - [`params`] holds the typed parameter map.
//! - [`kind`] defines the [`TaskKind`] contract and the template-driven
//!   [`ShellCommand`] kind.
//! - [`inputs`] infers input files from parameter values.

pub mod inputs;
pub mod kind;
pub mod params;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::Result;
use crate::fs::FileSystem;

pub use kind::{ShellCommand, TaskKind};
pub use params::{Param, Params};

/// Position of a task in its pipeline's registry.
pub type TaskId = usize;

/// A registered unit of work.
///
/// Everything except the `skip`/`clobber` flags and the metadata prefix is
/// fixed at construction.
#[derive(Debug, Clone)]
pub struct Task {
    index: TaskId,
    kind: Arc<dyn TaskKind>,
    comment: String,
    params: Params,
    command: String,
    outputs: Vec<PathBuf>,
    inputs: BTreeSet<PathBuf>,
    clobber: bool,
    skip: bool,
    metadata_prefix: Option<PathBuf>,
}

impl Task {
    /// Render, resolve outputs and infer inputs. `clobber` and `skip` may be
    /// passed as boolean parameters; they are consumed, not rendered.
    pub(crate) fn build(
        index: TaskId,
        kind: Arc<dyn TaskKind>,
        comment: impl Into<String>,
        params: Params,
    ) -> Result<Self> {
        let comment = comment.into();

        let mut merged = kind.defaults();
        merged.extend(params);
        let clobber = merged.take_flag("clobber");
        let skip = merged.take_flag("skip");

        let command = kind.render(&merged)?;

        let outputs = match kind.outputs(&merged)? {
            Some(outputs) => outputs,
            None => match merged.get("output") {
                Some(Param::File(path)) => vec![path.clone()],
                Some(value) => vec![PathBuf::from(value.render())],
                None => {
                    warn!(
                        task = index,
                        kind = kind.name(),
                        %comment,
                        "no outputs declared for task; its outputs can't be tracked"
                    );
                    Vec::new()
                }
            },
        };

        let inputs = inputs::infer_inputs(&merged, kind.non_file_params(), &outputs);
        debug!(
            task = index,
            kind = kind.name(),
            inputs = inputs.len(),
            outputs = outputs.len(),
            "registered task"
        );

        Ok(Self {
            index,
            kind,
            comment,
            params: merged,
            command,
            outputs,
            inputs,
            clobber,
            skip,
            metadata_prefix: None,
        })
    }

    pub fn index(&self) -> TaskId {
        self.index
    }

    pub fn kind(&self) -> &dyn TaskKind {
        self.kind.as_ref()
    }

    pub fn kind_name(&self) -> &str {
        self.kind.name()
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The rendered command line.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }

    pub fn inputs(&self) -> &BTreeSet<PathBuf> {
        &self.inputs
    }

    pub fn clobber(&self) -> bool {
        self.clobber
    }

    pub fn skip(&self) -> bool {
        self.skip
    }

    pub fn set_clobber(&mut self, clobber: bool) {
        self.clobber = clobber;
    }

    pub fn set_skip(&mut self, skip: bool) {
        self.skip = skip;
    }

    pub fn metadata_prefix(&self) -> Option<&Path> {
        self.metadata_prefix.as_deref()
    }

    pub(crate) fn set_metadata_prefix(&mut self, prefix: PathBuf) {
        self.metadata_prefix = Some(prefix);
    }

    /// Parameters whose value is one of this task's outputs.
    pub fn named_outputs(&self) -> BTreeMap<String, PathBuf> {
        self.params
            .iter()
            .filter_map(|(name, value)| {
                let path = value.as_path()?;
                self.outputs
                    .iter()
                    .any(|out| out == path)
                    .then(|| (name.to_string(), path.to_path_buf()))
            })
            .collect()
    }

    /// True when the task declares outputs and all of them exist.
    pub fn outputs_exist(&self, fs: &dyn FileSystem) -> bool {
        !self.outputs.is_empty() && self.outputs.iter().all(|out| fs.exists(out))
    }
}
