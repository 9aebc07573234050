// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod dataset;
pub mod emit;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod task;
pub mod template;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{build_pipeline, load_and_validate, ConfigFile};
use crate::dag::{collapse_by_stage, compute_stages, compute_stages_bottomup};
use crate::emit::{gather_subject_exports, generate_from_datasets, GenerateOptions};
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::Pipeline;

pub use crate::dataset::{Dataset, DatasetSpec};
pub use crate::errors::PipebuildError;
pub use crate::pipeline::DatasetId;
pub use crate::task::{Param, Params, ShellCommand, Task, TaskId, TaskKind};

/// High-level entry point used by `main.rs`. Returns the process exit code.
pub fn run(args: CliArgs) -> Result<i32> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    match args.command {
        Command::Build {
            config,
            clobber,
            dry_run,
        } => {
            let cfg = load(&config)?;
            let mut pipeline = build_pipeline(&cfg, fs)?;
            if dry_run {
                print_dry_run(&pipeline, clobber || cfg.config.clobber);
                return Ok(0);
            }

            let options = GenerateOptions {
                log_folder: cfg.config.log_folder.clone(),
                short_id: cfg.config.short_id.clone(),
                track: cfg.config.export,
                clobber_existing_outputs: clobber || cfg.config.clobber,
                wrapper: cfg.config.wrap.then(|| cfg.config.wrapper.clone()),
            };
            let datasets = pipeline.dataset_ids();
            let artifacts = generate_from_datasets(&mut pipeline, &datasets, &options)?;
            println!("{}", artifacts.script.display());
            Ok(0)
        }

        Command::Stages { config, bottom_up } => {
            let cfg = load(&config)?;
            let pipeline = build_pipeline(&cfg, fs)?;
            print_stages(&pipeline, bottom_up)?;
            Ok(0)
        }

        Command::Wrap { prefix, command } => {
            let code = exec::run_wrapped(fs.as_ref(), &prefix, &command)?;
            Ok(code)
        }

        Command::Gather {
            config,
            dataset,
            field,
            output,
            subjects,
        } => {
            let cfg = load(&config)?;
            let pipeline = build_pipeline(&cfg, Arc::clone(&fs))?;
            let id = pipeline
                .dataset_by_name(&dataset)
                .ok_or_else(|| PipebuildError::UnknownDataset(dataset.clone()))?;
            let ds = pipeline.dataset(id);
            let included = gather_subject_exports(
                fs.as_ref(),
                |fields| ds.log_folder(fields),
                &field,
                &subjects,
                &output,
            )?;
            info!(?included, "gathered exports");
            println!("{}", output.display());
            Ok(0)
        }
    }
}

fn load(path: &Path) -> Result<ConfigFile> {
    load_and_validate(path).with_context(|| format!("loading config {}", path.display()))
}

/// Print each task with its outputs, inputs and whether it would run.
fn print_dry_run(pipeline: &Pipeline, clobber: bool) {
    println!("pipebuild dry-run");
    println!("  datasets: {}", pipeline.datasets().len());
    println!();

    println!("tasks ({}):", pipeline.tasks().len());
    for task in pipeline.tasks() {
        println!("  [{}] {} ({})", task.index(), task.comment(), task.kind_name());
        println!("      cmd: {}", task.command());
        if !task.outputs().is_empty() {
            println!("      outputs: {:?}", task.outputs());
        }
        if !task.inputs().is_empty() {
            println!("      inputs: {:?}", task.inputs());
        }
        if task.skip() {
            println!("      skip: true");
        } else if !clobber && !task.clobber() && task.outputs_exist(pipeline.fs()) {
            println!("      outputs present: true");
        }
    }

    debug!("dry-run complete (nothing written)");
}

fn print_stages(pipeline: &Pipeline, bottom_up: bool) -> Result<()> {
    print!("{}", stage_summary(pipeline, bottom_up)?);
    Ok(())
}

/// Human-readable listing of the stages and their supernodes, one kind per
/// supernode with its description (if any) and the member tasks.
pub fn stage_summary(pipeline: &Pipeline, bottom_up: bool) -> Result<String> {
    let graph = pipeline.dependency_graph();
    let stages = if bottom_up {
        compute_stages_bottomup(&graph)?
    } else {
        compute_stages(&graph)?
    };

    let mut out = String::new();
    for (n, groups) in collapse_by_stage(&stages, pipeline).iter().enumerate() {
        out.push_str(&format!("stage {n}:\n"));
        for group in groups {
            let Some(&first) = group.first() else {
                continue;
            };
            let kind = pipeline.task(first).kind();
            out.push_str(&format!("  {} {group:?}", kind.name()));
            if !kind.description().is_empty() {
                out.push_str(&format!(" ({})", kind.description()));
            }
            out.push('\n');
            for &t in group {
                out.push_str(&format!("    - {}\n", pipeline.task(t).comment()));
            }
        }
    }
    Ok(out)
}
