// src/dag/stages.rs

//! Partitioning the dependency graph into ordered stages.
//!
//! A stage only depends on tasks from earlier stages. Two orderings are
//! provided:
//!
//! - [`compute_stages`] works top-down from tasks with no prerequisites, so
//!   a task lands in the first stage where it could run.
//! - [`compute_stages_bottomup`] works up from tasks nothing depends on, so
//!   a task's stage reflects its distance from the final outputs. This is
//!   the layout used for the pipeline export.
//!
//! Both fail with [`PipebuildError::DependencyCycle`] when the graph cannot
//! be fully staged.

use tracing::debug;

use crate::dag::graph::DependencyGraph;
use crate::errors::{PipebuildError, Result};
use crate::task::TaskId;

/// Ordered stages of task indices. Within a stage, tasks are in the order
/// they were reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stages(Vec<Vec<TaskId>>);

impl Stages {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[TaskId]> {
        self.0.iter().map(Vec::as_slice)
    }

    pub fn as_slice(&self) -> &[Vec<TaskId>] {
        &self.0
    }

    /// Index of the stage containing `task`.
    pub fn stage_of(&self, task: TaskId) -> Option<usize> {
        self.0.iter().position(|stage| stage.contains(&task))
    }
}

/// Top-down staging: stage 0 holds every task without prerequisites; a task
/// joins the stage after its last prerequisite is placed.
pub fn compute_stages(graph: &DependencyGraph) -> Result<Stages> {
    let stages = sweep(
        graph,
        |task| graph.prerequisites_of(task),
        |task| graph.dependents_of(task),
    );
    let stages = ensure_complete(graph, stages)?;
    debug!(stages = stages.len(), "computed top-down stages");
    Ok(stages)
}

/// Bottom-up staging: starts from tasks without dependents, promotes a
/// prerequisite once all its dependents are placed, then reverses so that
/// stage 0 runs first.
pub fn compute_stages_bottomup(graph: &DependencyGraph) -> Result<Stages> {
    let mut stages = sweep(
        graph,
        |task| graph.dependents_of(task),
        |task| graph.prerequisites_of(task),
    );
    stages.reverse();
    let stages = ensure_complete(graph, stages)?;
    debug!(stages = stages.len(), "computed bottom-up stages");
    Ok(stages)
}

/// Generic frontier sweep.
///
/// `blockers(t)` must all be placed before `t` can be; `unlocks(t)` lists
/// the tasks that may become placeable once `t` is.
fn sweep<B, U>(graph: &DependencyGraph, blockers: B, unlocks: U) -> Vec<Vec<TaskId>>
where
    B: Fn(TaskId) -> Vec<TaskId>,
    U: Fn(TaskId) -> Vec<TaskId>,
{
    let n = graph.len();
    let mut placed = vec![false; n];
    let mut queued = vec![false; n];

    let mut current: Vec<TaskId> = (0..n).filter(|&t| blockers(t).is_empty()).collect();
    for &t in &current {
        queued[t] = true;
    }

    let mut stages = Vec::new();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &task in &current {
            placed[task] = true;
            for candidate in unlocks(task) {
                if placed[candidate] || queued[candidate] {
                    continue;
                }
                if blockers(candidate).iter().all(|&b| placed[b]) {
                    queued[candidate] = true;
                    next.push(candidate);
                }
            }
        }
        stages.push(current);
        current = next;
    }
    stages
}

fn ensure_complete(graph: &DependencyGraph, stages: Vec<Vec<TaskId>>) -> Result<Stages> {
    let staged: usize = stages.iter().map(Vec::len).sum();
    if staged == graph.len() {
        return Ok(Stages(stages));
    }

    let mut is_staged = vec![false; graph.len()];
    for &t in stages.iter().flatten() {
        is_staged[t] = true;
    }
    let task = graph
        .cycle_member()
        .or_else(|| is_staged.iter().position(|s| !s))
        .unwrap_or(0);

    Err(PipebuildError::DependencyCycle {
        unplaced: graph.len() - staged,
        task,
    })
}
