// src/dag/grouping.rs

//! Grouping interchangeable tasks of a stage into supernodes for display.
//!
//! Two tasks of one stage are interchangeable when they have the same kind
//! and read the same pipeline-produced files. Original inputs (files that
//! exist before the pipeline runs) are ignored for the comparison, as is the
//! value of the kind's grouping-exempt parameter. Tasks whose comparison key
//! ends up empty share nothing meaningful and each get their own supernode.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::dag::stages::Stages;
use crate::pipeline::Pipeline;
use crate::task::{Task, TaskId};

/// Tasks shown as one node.
pub type Supernode = Vec<TaskId>;

/// Group each stage's tasks into supernodes.
///
/// Supernodes within a stage are sorted by their task lists, and tasks
/// within a supernode keep their stage order.
pub fn collapse_by_stage(stages: &Stages, pipeline: &Pipeline) -> Vec<Vec<Supernode>> {
    stages
        .iter()
        .map(|stage| collapse_stage(stage, pipeline))
        .collect()
}

fn collapse_stage(stage: &[TaskId], pipeline: &Pipeline) -> Vec<Supernode> {
    let mut groups: BTreeMap<(String, BTreeSet<PathBuf>), Vec<TaskId>> = BTreeMap::new();
    for &idx in stage {
        let task = pipeline.task(idx);
        let key = (task.kind_name().to_string(), shared_inputs(task, pipeline));
        groups.entry(key).or_default().push(idx);
    }

    let mut supernodes: Vec<Supernode> = Vec::new();
    for ((_, shared), members) in groups {
        if shared.is_empty() {
            supernodes.extend(members.into_iter().map(|idx| vec![idx]));
        } else {
            supernodes.push(members);
        }
    }
    supernodes.sort();
    supernodes
}

/// Inputs that define a task's structural role.
fn shared_inputs(task: &Task, pipeline: &Pipeline) -> BTreeSet<PathBuf> {
    let exempt = task
        .kind()
        .grouping_exempt_param()
        .and_then(|name| task.params().get(name))
        .and_then(|value| value.as_path());

    task.inputs()
        .iter()
        .filter(|input| !pipeline.is_original_file(input))
        .filter(|input| exempt != Some(input.as_path()))
        .cloned()
        .collect()
}
