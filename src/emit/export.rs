// src/emit/export.rs

//! JSON description of a pipeline for external viewers.
//!
//! The layout follows the bottom-up staging, with each stage's tasks grouped
//! into supernodes. Building the export also assigns every task its
//! metadata-file prefix.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dag::{collapse_by_stage, compute_stages_bottomup};
use crate::emit::command_hash;
use crate::errors::Result;
use crate::pipeline::Pipeline;
use crate::task::{Task, TaskId};

pub const TASK_INFO_VERSION: u32 = 1;

/// Kind names conventionally end in this; it is stripped in `klasses`.
const KIND_SUFFIX: &str = "Command";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineExport {
    pub supernodes: Vec<SupernodeRecord>,
    pub klasses: Vec<String>,
    pub subnodes: Vec<SubnodeRecord>,
    pub links: Vec<LinkRecord>,
    /// Task index → supernode index.
    pub reverse_mapping: BTreeMap<TaskId, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupernodeRecord {
    pub stage: usize,
    /// Position within the stage.
    pub height: usize,
    pub index: usize,
    pub class: usize,
    pub id: String,
    pub subnodes: Vec<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnodeRecord {
    pub name: String,
    pub class: usize,
    pub id: String,
    pub klass: usize,
    pub command_line: String,
    pub outputs: Vec<PathBuf>,
    pub named_outfiles: BTreeMap<String, PathBuf>,
    pub metadata_prefix: PathBuf,
    pub index: TaskId,
    pub supernode: usize,
    pub task_info: TaskMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub version: u32,
    pub comment: String,
    pub outfiles: Vec<PathBuf>,
    pub all_inputs: Vec<PathBuf>,
    pub cmd: String,
    pub original_inputs: Vec<PathBuf>,
    pub intermediate_inputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub weight: usize,
    pub supersource: usize,
    pub supertarget: usize,
}

/// Build the export and record `<metadata_path>/<command hash>` as each
/// task's metadata prefix.
pub fn build_export(pipeline: &mut Pipeline, metadata_path: &Path) -> Result<PipelineExport> {
    let graph = pipeline.dependency_graph();
    let stages = compute_stages_bottomup(&graph)?;
    let collapsed = collapse_by_stage(&stages, pipeline);

    // Kind ids in order of first registration.
    let mut kind_names: Vec<String> = Vec::new();
    for task in pipeline.tasks() {
        if !kind_names.iter().any(|k| k == task.kind_name()) {
            kind_names.push(task.kind_name().to_string());
        }
    }
    let class_of = |task: &Task| {
        kind_names
            .iter()
            .position(|k| k == task.kind_name())
            .unwrap_or(0)
    };

    let mut supernodes = Vec::new();
    let mut reverse_mapping = BTreeMap::new();
    for (stage, groups) in collapsed.into_iter().enumerate() {
        for (height, members) in groups.into_iter().enumerate() {
            let index = supernodes.len();
            for &task in &members {
                reverse_mapping.insert(task, index);
            }
            supernodes.push(SupernodeRecord {
                stage,
                height,
                index,
                class: members.first().map_or(0, |&t| class_of(pipeline.task(t))),
                id: format!("supernode{index}"),
                subnodes: members,
            });
        }
    }

    for task in pipeline.tasks_mut() {
        let prefix = metadata_path.join(command_hash(task.command()));
        task.set_metadata_prefix(prefix);
    }

    let subnodes = pipeline
        .tasks()
        .iter()
        .map(|task| {
            let class = class_of(task);
            SubnodeRecord {
                name: task.comment().to_string(),
                class,
                id: format!("subnode{}", task.index()),
                klass: class,
                command_line: task.command().to_string(),
                outputs: task.outputs().to_vec(),
                named_outfiles: task.named_outputs(),
                metadata_prefix: task
                    .metadata_prefix()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
                index: task.index(),
                supernode: reverse_mapping.get(&task.index()).copied().unwrap_or(0),
                task_info: task_metadata(task, pipeline),
            }
        })
        .collect();

    let mut weights: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for (i, j, weight) in graph.edges() {
        if let (Some(&si), Some(&sj)) = (reverse_mapping.get(&i), reverse_mapping.get(&j)) {
            *weights.entry((si, sj)).or_default() += weight;
        }
    }
    let links = weights
        .into_iter()
        .filter(|&(_, weight)| weight > 0)
        .map(|((supersource, supertarget), weight)| LinkRecord {
            weight,
            supersource,
            supertarget,
        })
        .collect();

    let klasses = kind_names
        .iter()
        .map(|name| name.strip_suffix(KIND_SUFFIX).unwrap_or(name).to_string())
        .collect();

    Ok(PipelineExport {
        supernodes,
        klasses,
        subnodes,
        links,
        reverse_mapping,
    })
}

/// Per-task metadata block, with inputs split by whether a dataset's
/// original template accounts for them.
pub fn task_metadata(task: &Task, pipeline: &Pipeline) -> TaskMetadata {
    let mut outfiles = task.outputs().to_vec();
    outfiles.sort();
    let all_inputs: Vec<PathBuf> = task.inputs().iter().cloned().collect();
    let (original_inputs, intermediate_inputs): (Vec<PathBuf>, Vec<PathBuf>) = all_inputs
        .iter()
        .cloned()
        .partition(|input| pipeline.is_original_file(input));

    TaskMetadata {
        version: TASK_INFO_VERSION,
        comment: task.comment().to_string(),
        outfiles,
        all_inputs,
        cmd: task.command().to_string(),
        original_inputs,
        intermediate_inputs,
    }
}

/// Build the export and write it to `path` as JSON.
pub fn write_export(pipeline: &mut Pipeline, path: &Path, metadata_path: &Path) -> Result<PipelineExport> {
    let export = build_export(pipeline, metadata_path)?;
    let json = serde_json::to_string(&export)?;
    pipeline.fs().write(path, json.as_bytes())?;
    info!(
        export = ?path,
        supernodes = export.supernodes.len(),
        links = export.links.len(),
        "wrote pipeline export"
    );
    Ok(export)
}
