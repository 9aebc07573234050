// src/task/kind.rs

//! Task kinds: the contract a command wrapper fulfils towards the pipeline.
//!
//! A kind knows how to turn a parameter map into a shell command line and
//! which parameters name its outputs. Everything else (input inference,
//! dependency tracking, script emission) is generic.

use std::fmt::Debug;
use std::path::PathBuf;

use crate::errors::{PipebuildError, Result};
use crate::task::params::{Param, Params};
use crate::template::Template;

/// Name of the built-in kind returned by [`ShellCommand::input_output`].
pub const INPUT_OUTPUT_KIND: &str = "InputOutputCommand";

pub trait TaskKind: Send + Sync + Debug {
    /// Kind name, e.g. `InputOutputCommand`. Tasks of the same kind share it.
    fn name(&self) -> &str;

    /// Short human-readable description of the kind.
    fn description(&self) -> &str {
        ""
    }

    /// Parameters merged underneath the caller's parameters.
    fn defaults(&self) -> Params {
        Params::new()
    }

    /// Render the shell command line.
    fn render(&self, params: &Params) -> Result<String>;

    /// Declared outputs, if this kind knows them. `None` falls back to the
    /// `output` parameter.
    fn outputs(&self, _params: &Params) -> Result<Option<Vec<PathBuf>>> {
        Ok(None)
    }

    /// Parameters never treated as input files (e.g. an absolute path to the
    /// executable).
    fn non_file_params(&self) -> &[String] {
        &[]
    }

    /// Parameter whose value may differ between tasks without changing their
    /// structural role, such as the moving image of a warp.
    fn grouping_exempt_param(&self) -> Option<&str> {
        None
    }
}

/// A kind defined by a `{param}` command template.
///
/// ```
/// use pipebuild::task::ShellCommand;
///
/// let robex = ShellCommand::new("RobexCommand", "runROBEX.sh {input} {output} {out_mask}")
///     .unwrap()
///     .outputs_from(["output", "out_mask"]);
/// ```
#[derive(Debug, Clone)]
pub struct ShellCommand {
    name: String,
    description: String,
    template: Template,
    output_params: Vec<String>,
    non_file: Vec<String>,
    grouping_exempt: Option<String>,
    defaults: Params,
}

impl ShellCommand {
    pub fn new(name: impl Into<String>, template: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            description: String::new(),
            template: Template::parse(template)?,
            output_params: Vec::new(),
            non_file: Vec::new(),
            grouping_exempt: None,
            defaults: Params::new(),
        })
    }

    /// `<cmd_name> <input> <output> <extra_args>`, with `extra_args`
    /// defaulting to nothing.
    pub fn input_output() -> Result<Self> {
        Ok(
            Self::new(INPUT_OUTPUT_KIND, "{cmd_name} {input} {output} {extra_args}")?
                .describe("input/output shell command")
                .non_file(["cmd_name"])
                .default_param("extra_args", ""),
        )
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Parameters whose values are this kind's outputs, in order.
    pub fn outputs_from<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn non_file<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_file = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn grouping_exempt(mut self, param: impl Into<String>) -> Self {
        self.grouping_exempt = Some(param.into());
        self
    }

    pub fn default_param(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.defaults.insert(name, value);
        self
    }

    fn missing(&self, param: &str) -> PipebuildError {
        PipebuildError::MissingParameter {
            kind: self.name.clone(),
            param: param.to_string(),
        }
    }
}

impl TaskKind for ShellCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn defaults(&self) -> Params {
        self.defaults.clone()
    }

    fn render(&self, params: &Params) -> Result<String> {
        self.template
            .render_with(|name| params.get(name).map(Param::render))
            .map_err(|e| match e {
                PipebuildError::MissingField { field, .. } => self.missing(&field),
                other => other,
            })
    }

    fn outputs(&self, params: &Params) -> Result<Option<Vec<PathBuf>>> {
        if self.output_params.is_empty() {
            return Ok(None);
        }

        let mut outputs = Vec::new();
        for name in &self.output_params {
            match params.get(name) {
                Some(Param::List(items)) => {
                    outputs.extend(items.iter().map(|item| PathBuf::from(item.render())));
                }
                Some(value) => outputs.push(PathBuf::from(value.render())),
                None => return Err(self.missing(name)),
            }
        }
        Ok(Some(outputs))
    }

    fn non_file_params(&self) -> &[String] {
        &self.non_file
    }

    fn grouping_exempt_param(&self) -> Option<&str> {
        self.grouping_exempt.as_deref()
    }
}
