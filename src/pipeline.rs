// src/pipeline.rs

//! The pipeline under construction: an ordered task registry plus the
//! datasets the tasks read from and write to.
//!
//! Task order is registration order and is authoritative: the emitted script
//! runs tasks in exactly this order, and indices are never reassigned.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::dag::DependencyGraph;
use crate::dataset::{Dataset, DatasetSpec};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::task::{Params, Task, TaskId, TaskKind};

/// Handle to a dataset registered in a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetId(usize);

pub struct Pipeline {
    fs: Arc<dyn FileSystem>,
    datasets: Vec<Dataset>,
    tasks: Vec<Task>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("datasets", &self.datasets.len())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            datasets: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn add_dataset(&mut self, name: impl Into<String>, spec: DatasetSpec) -> Result<DatasetId> {
        let dataset = Dataset::new(name, spec, Arc::clone(&self.fs))?;
        debug!(dataset = %dataset.name(), "registered dataset");
        self.datasets.push(dataset);
        Ok(DatasetId(self.datasets.len() - 1))
    }

    pub fn dataset(&self, id: DatasetId) -> &Dataset {
        &self.datasets[id.0]
    }

    pub fn dataset_mut(&mut self, id: DatasetId) -> &mut Dataset {
        &mut self.datasets[id.0]
    }

    pub fn dataset_by_name(&self, name: &str) -> Option<DatasetId> {
        self.datasets
            .iter()
            .position(|d| d.name() == name)
            .map(DatasetId)
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn dataset_ids(&self) -> Vec<DatasetId> {
        (0..self.datasets.len()).map(DatasetId).collect()
    }

    /// Construct a task and append it to the registry.
    ///
    /// Rendering failures abort here, before anything is registered.
    pub fn add_task(
        &mut self,
        kind: Arc<dyn TaskKind>,
        comment: impl Into<String>,
        params: Params,
    ) -> Result<TaskId> {
        let index = self.tasks.len();
        let task = Task::build(index, kind, comment, params)?;
        self.tasks.push(task);
        Ok(index)
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id]
    }

    pub fn task_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.tasks[id]
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub(crate) fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    /// Drop every registered task, keeping the datasets.
    pub fn clear_tasks(&mut self) {
        self.tasks.clear();
    }

    /// Dependency graph over the current registry. Computed fresh on every
    /// call; hold on to it only while the registry is unchanged.
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_tasks(&self.tasks)
    }

    /// Whether any dataset's original template could have produced `path`.
    pub fn is_original_file(&self, path: &Path) -> bool {
        self.datasets.iter().any(|d| d.is_original_file(path))
    }
}
