use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pipebuild::config::{build_pipeline, load_and_validate, parse_str, ConfigFile, ParamConfig};
use pipebuild::errors::PipebuildError;
use pipebuild::fs::mock::MockFileSystem;
use pipebuild::task::Param;
use pipebuild_test_utils::builders::{dataset_config, ConfigFileBuilder, TaskConfigBuilder};
use pipebuild_test_utils::init_tracing;
use tempfile::tempdir;

const PIPELINE_TOML: &str = r#"
[config]
log_folder = "/data/logs"
short_id = "prep"

[dataset.scans]
base_dir = "/data"
original = "{subj}/{subj}_{feature}"
processing = "{subj}/proc/{subj}_{feature}_{modifiers}"
mandatory = [{ feature = "t1" }]

[kind.BiasCorrectCommand]
command = "N4BiasFieldCorrection -d 3 -i {input} -o {output} {flags}"
description = "bias field correction"
defaults = { flags = "" }

[[task]]
kind = "BiasCorrectCommand"
comment = "Bias correct s1 t1"
params.input = { original = "scans", fields = { subj = "s1", feature = "t1" } }
params.output = { processing = "scans", fields = { subj = "s1", feature = "t1", modifiers = "n4" } }

[[task]]
kind = "InputOutputCommand"
comment = "Copy corrected image"
skip = true
params.cmd_name = "cp"
params.input = { file = "/data/s1/proc/s1_t1_n4.nii.gz" }
params.output = "/data/s1/proc/copy.nii.gz"
params.extra_args = ["-v", 2]
"#;

fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Pipebuild.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn test_load_and_validate_from_disk() {
    init_tracing();
    let (_dir, path) = write_config(PIPELINE_TOML);
    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.config.log_folder, PathBuf::from("/data/logs"));
    assert_eq!(cfg.config.short_id, "prep");
    assert!(cfg.config.export);
    assert!(!cfg.config.wrap);
    assert_eq!(cfg.dataset["scans"].mandatory.len(), 1);
    assert_eq!(cfg.task.len(), 2);
    assert!(cfg.task[1].skip);
    assert_eq!(
        cfg.task[1].params["extra_args"],
        ParamConfig::List(vec![ParamConfig::Text("-v".into()), ParamConfig::Int(2)])
    );
    assert_eq!(
        cfg.task[1].params["input"],
        ParamConfig::File {
            file: PathBuf::from("/data/s1/proc/s1_t1_n4.nii.gz")
        }
    );
}

#[test]
fn test_build_pipeline_resolves_dataset_params() {
    let (_dir, path) = write_config(PIPELINE_TOML);
    let cfg = load_and_validate(&path).unwrap();

    let fs = MockFileSystem::new();
    fs.add_file("/data/s1/s1_t1.nii.gz", "");
    let pipeline = build_pipeline(&cfg, Arc::new(fs)).unwrap();

    assert_eq!(pipeline.tasks().len(), 2);
    let n4 = pipeline.task(0);
    assert_eq!(
        n4.command(),
        "N4BiasFieldCorrection -d 3 -i /data/s1/s1_t1.nii.gz -o /data/s1/proc/s1_t1_n4.nii.gz "
    );
    assert_eq!(
        n4.outputs(),
        &[PathBuf::from("/data/s1/proc/s1_t1_n4.nii.gz")]
    );

    let copy = pipeline.task(1);
    assert!(copy.skip());
    assert_eq!(copy.command(), "cp /data/s1/proc/s1_t1_n4.nii.gz /data/s1/proc/copy.nii.gz -v 2");
    assert_eq!(
        copy.params().get("input"),
        Some(&Param::File(PathBuf::from("/data/s1/proc/s1_t1_n4.nii.gz")))
    );

    let graph = pipeline.dependency_graph();
    assert_eq!(graph.weight(0, 1), 1);
}

#[test]
fn test_missing_mandatory_input_aborts_build() {
    let (_dir, path) = write_config(PIPELINE_TOML);
    let cfg = load_and_validate(&path).unwrap();

    let err = build_pipeline(&cfg, Arc::new(MockFileSystem::new())).unwrap_err();
    assert!(matches!(err, PipebuildError::MissingMandatoryInput(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_and_validate(Path::new("/definitely/not/here/Pipebuild.toml")).unwrap_err();
    assert!(matches!(err, PipebuildError::IoError(_)));
}

#[test]
fn test_invalid_toml_is_reported() {
    let err = parse_str("[[task]\nkind = ").unwrap_err();
    assert!(matches!(err, PipebuildError::TomlError(_)));
}

#[test]
fn test_config_without_tasks_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_kind("EchoCommand", "echo {msg}")
        .build_raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, PipebuildError::ConfigError(_)));
}

#[test]
fn test_unknown_kind_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_task(TaskConfigBuilder::new("NopeCommand", "x").build())
        .build_raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, PipebuildError::UnknownKind(k) if k == "NopeCommand"));
}

#[test]
fn test_unknown_dataset_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_kind("CopyCommand", "cp {input} {output}")
        .with_task(
            TaskConfigBuilder::new("CopyCommand", "copy")
                .original("input", "missing", &[("subj", "s1")])
                .text("output", "/out")
                .build(),
        )
        .build_raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, PipebuildError::UnknownDataset(d) if d == "missing"));
}

#[test]
fn test_processing_reference_needs_processing_template() {
    let raw = ConfigFileBuilder::new()
        .with_dataset("raw", dataset_config("/data", "{subj}", None))
        .with_kind("CopyCommand", "cp {input} {output}")
        .with_task(
            TaskConfigBuilder::new("CopyCommand", "copy")
                .text("input", "/in")
                .processing("output", "raw", &[("subj", "s1")])
                .build(),
        )
        .build_raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, PipebuildError::ConfigError(_)));
}

#[test]
fn test_short_id_with_slash_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .short_id("a/b")
        .with_kind("EchoCommand", "echo {msg}")
        .with_task(TaskConfigBuilder::new("EchoCommand", "hi").text("msg", "hi").build())
        .build_raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, PipebuildError::ConfigError(_)));
}

#[test]
fn test_malformed_kind_template_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_kind("BadCommand", "echo {}")
        .with_task(TaskConfigBuilder::new("BadCommand", "bad").build())
        .build_raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, PipebuildError::MalformedTemplate { .. }));
}

#[test]
fn test_builder_config_builds_pipeline() {
    let cfg = ConfigFileBuilder::new()
        .with_dataset("raw", dataset_config("/data", "{subj}", Some("proc/{subj}_{step}")))
        .with_kind("CopyCommand", "cp {input} {output}")
        .with_task(
            TaskConfigBuilder::new("CopyCommand", "copy s1")
                .original("input", "raw", &[("subj", "s1")])
                .processing("output", "raw", &[("subj", "s1"), ("step", "copy")])
                .clobber(true)
                .build(),
        )
        .build();

    let pipeline = build_pipeline(&cfg, Arc::new(MockFileSystem::new())).unwrap();
    let task = pipeline.task(0);
    assert!(task.clobber());
    assert_eq!(task.command(), "cp /data/s1.nii.gz /data/proc/s1_copy.nii.gz");

    // The original input does not exist and is not mandatory.
    let ds = pipeline.dataset_by_name("raw").unwrap();
    assert!(pipeline.dataset(ds).is_invalid(Path::new("/data/s1.nii.gz")));
}
