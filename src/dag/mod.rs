// src/dag/mod.rs

//! Task dependency graph, staging and grouping.
//!
//! - [`graph`] derives file-level dependencies from a task registry.
//! - [`stages`] partitions the graph into ordered stages.
//! - [`grouping`] clusters interchangeable tasks of a stage into supernodes.

pub mod graph;
pub mod grouping;
pub mod stages;

pub use graph::DependencyGraph;
pub use grouping::{collapse_by_stage, Supernode};
pub use stages::{compute_stages, compute_stages_bottomup, Stages};
