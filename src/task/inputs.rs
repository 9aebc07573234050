// src/task/inputs.rs

//! Input inference from task parameters.
//!
//! Inputs are never declared explicitly; they are read off the parameter
//! values:
//! - text values are split on unescaped whitespace and every absolute path
//!   token counts as an input,
//! - list values contribute their elements whole (absolute text or files),
//! - file values always count.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::task::params::{Param, Params};

/// Split on runs of whitespace, except whitespace directly preceded by a
/// backslash (`/data/my\ scan.nii` stays one token).
pub fn split_unescaped_whitespace(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut after_backslash = false;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() && !after_backslash {
            if let Some(s) = start.take() {
                tokens.push(&text[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
        after_backslash = c == '\\';
    }

    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

/// Infer the input files of a task.
///
/// `skip` names parameters that are never inputs; `outputs` are removed from
/// the result so a task never depends on itself.
pub fn infer_inputs(params: &Params, skip: &[String], outputs: &[PathBuf]) -> BTreeSet<PathBuf> {
    let mut inputs = BTreeSet::new();

    for (name, value) in params.iter() {
        if skip.iter().any(|s| s == name) {
            continue;
        }
        match value {
            Param::Text(text) => {
                inputs.extend(
                    split_unescaped_whitespace(text)
                        .into_iter()
                        .filter(|token| Path::new(token).is_absolute())
                        .map(PathBuf::from),
                );
            }
            Param::File(path) => {
                inputs.insert(path.clone());
            }
            Param::List(items) => {
                for item in items {
                    match item {
                        Param::Text(text) if Path::new(text).is_absolute() => {
                            inputs.insert(PathBuf::from(text));
                        }
                        Param::File(path) => {
                            inputs.insert(path.clone());
                        }
                        _ => {}
                    }
                }
            }
            Param::Int(_) | Param::Float(_) | Param::Bool(_) => {}
        }
    }

    for output in outputs {
        inputs.remove(output);
    }
    inputs
}
