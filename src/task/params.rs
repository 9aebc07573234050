// src/task/params.rs

//! Named task parameters.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A single parameter value.
///
/// `File` marks a value as file-like regardless of its shape, so it always
/// takes part in dependency tracking. `Text` values only do when they contain
/// absolute paths.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    File(PathBuf),
    List(Vec<Param>),
}

impl Param {
    /// The value as it appears on a command line. Lists are space-separated.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// The value read as a single path, for text and file values.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Param::Text(s) => Some(Path::new(s)),
            Param::File(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Text(s) => f.write_str(s),
            Param::Int(i) => write!(f, "{i}"),
            Param::Float(x) => write!(f, "{x}"),
            Param::Bool(b) => write!(f, "{b}"),
            Param::File(p) => write!(f, "{}", p.display()),
            Param::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Text(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Text(s)
    }
}

impl From<i64> for Param {
    fn from(i: i64) -> Self {
        Param::Int(i)
    }
}

impl From<f64> for Param {
    fn from(x: f64) -> Self {
        Param::Float(x)
    }
}

impl From<bool> for Param {
    fn from(b: bool) -> Self {
        Param::Bool(b)
    }
}

impl From<PathBuf> for Param {
    fn from(p: PathBuf) -> Self {
        Param::File(p)
    }
}

impl From<&Path> for Param {
    fn from(p: &Path) -> Self {
        Param::File(p.to_path_buf())
    }
}

impl<T: Into<Param>> From<Vec<T>> for Param {
    fn from(items: Vec<T>) -> Self {
        Param::List(items.into_iter().map(Into::into).collect())
    }
}

/// Parameter name → value map, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, Param>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Param>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Param> {
        self.0.remove(name)
    }

    /// Remove a boolean flag, returning whether it was set to `true`.
    pub fn take_flag(&mut self, name: &str) -> bool {
        matches!(self.0.remove(name), Some(Param::Bool(true)))
    }

    /// Insert every entry of `other`, overwriting existing names.
    pub fn extend(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Param>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
