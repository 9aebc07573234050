// src/exec/mod.rs

//! Process execution layer.
//!
//! Pipelines are emitted as scripts rather than run in-process; the only
//! command executed here is the one handed to the metadata wrapper
//! (`pipebuild wrap`), see [`wrap`].

pub mod wrap;

pub use wrap::{metadata_file, run_wrapped, write_metadata, WrapSummary};
