// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::task::{Task, TaskId};

/// File-level dependencies between the tasks of one registry.
///
/// Edge `i -> j` exists when some output of task `i` is an input of task
/// `j`; its weight is the number of such files. Tasks never depend on
/// themselves.
///
/// The graph is a snapshot of the registry it was built from and is not
/// updated when tasks are added afterwards.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraphMap<TaskId, usize>,
    shared: BTreeMap<(TaskId, TaskId), Vec<PathBuf>>,
    len: usize,
}

impl DependencyGraph {
    /// Build the graph from a registry slice (task `k` at position `k`).
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut graph: DiGraphMap<TaskId, usize> = DiGraphMap::new();

        // Index producers by output filename so each input is one lookup.
        let mut producers: HashMap<&Path, Vec<TaskId>> = HashMap::new();
        for (i, task) in tasks.iter().enumerate() {
            graph.add_node(i);
            for output in task.outputs() {
                producers.entry(output.as_path()).or_default().push(i);
            }
        }

        let mut shared: BTreeMap<(TaskId, TaskId), Vec<PathBuf>> = BTreeMap::new();
        for (j, task) in tasks.iter().enumerate() {
            for input in task.inputs() {
                let Some(sources) = producers.get(input.as_path()) else {
                    continue;
                };
                for &i in sources.iter().filter(|&&i| i != j) {
                    shared.entry((i, j)).or_default().push(input.clone());
                }
            }
        }

        for (&(i, j), files) in &shared {
            graph.add_edge(i, j, files.len());
        }

        Self {
            graph,
            shared,
            len: tasks.len(),
        }
    }

    /// Number of tasks (nodes), including isolated ones.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of task `i` outputs consumed by task `j` (0 = no dependency).
    pub fn weight(&self, i: TaskId, j: TaskId) -> usize {
        self.graph.edge_weight(i, j).copied().unwrap_or(0)
    }

    /// Files produced by `i` and read by `j`.
    pub fn shared_files(&self, i: TaskId, j: TaskId) -> &[PathBuf] {
        self.shared.get(&(i, j)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tasks whose outputs `task` reads, in index order.
    pub fn prerequisites_of(&self, task: TaskId) -> Vec<TaskId> {
        self.neighbors(task, Direction::Incoming)
    }

    /// Tasks reading outputs of `task`, in index order.
    pub fn dependents_of(&self, task: TaskId) -> Vec<TaskId> {
        self.neighbors(task, Direction::Outgoing)
    }

    /// All edges as `(source, target, weight)`, ordered by source then target.
    pub fn edges(&self) -> impl Iterator<Item = (TaskId, TaskId, usize)> + '_ {
        self.shared
            .iter()
            .map(|(&(i, j), files)| (i, j, files.len()))
    }

    /// Dense `len × len` weight matrix.
    pub fn matrix(&self) -> Vec<Vec<usize>> {
        let mut matrix = vec![vec![0; self.len]; self.len];
        for (i, j, weight) in self.edges() {
            matrix[i][j] = weight;
        }
        matrix
    }

    /// Some task lying on a dependency cycle, if there is one.
    pub fn cycle_member(&self) -> Option<TaskId> {
        toposort(&self.graph, None).err().map(|cycle| cycle.node_id())
    }

    fn neighbors(&self, task: TaskId, direction: Direction) -> Vec<TaskId> {
        if !self.graph.contains_node(task) {
            return Vec::new();
        }
        let mut out: Vec<TaskId> = self.graph.neighbors_directed(task, direction).collect();
        out.sort_unstable();
        out
    }
}
