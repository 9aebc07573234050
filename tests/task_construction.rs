use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use pipebuild::errors::PipebuildError;
use pipebuild::task::inputs::{infer_inputs, split_unescaped_whitespace};
use pipebuild::task::{Param, Params, ShellCommand, TaskKind};
use pipebuild_test_utils::builders::mock_pipeline;
use pipebuild_test_utils::init_tracing;

fn paths(items: &[&str]) -> BTreeSet<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

#[test]
fn test_split_keeps_escaped_spaces() {
    assert_eq!(
        split_unescaped_whitespace("a  /x/my\\ scan.nii\t-v"),
        vec!["a", "/x/my\\ scan.nii", "-v"]
    );
    assert!(split_unescaped_whitespace("   ").is_empty());
}

#[test]
fn test_infer_inputs_accepts_absolute_and_file_values() {
    let params = Params::new()
        .with("flags", "-v --fast /atlas/t1.nii.gz relative/ignored.nii")
        .with("mask", PathBuf::from("relative/mask.nii.gz"))
        .with("iterations", 5i64)
        .with("sigma", 0.5f64)
        .with("verbose", true)
        .with("images", vec!["/a.nii", "b.nii"])
        .with("output", PathBuf::from("/out.nii"));

    let inputs = infer_inputs(&params, &[], &[PathBuf::from("/out.nii")]);
    assert_eq!(
        inputs,
        paths(&["/atlas/t1.nii.gz", "relative/mask.nii.gz", "/a.nii"])
    );
}

#[test]
fn test_infer_inputs_skips_non_file_params() {
    let params = Params::new()
        .with("cmd_name", "/usr/bin/robex")
        .with("input", "/in.nii");
    let inputs = infer_inputs(&params, &["cmd_name".to_string()], &[]);
    assert_eq!(inputs, paths(&["/in.nii"]));
}

#[test]
fn test_task_from_output_param() {
    init_tracing();
    let (mut pipeline, _fs) = mock_pipeline();
    let kind: Arc<dyn TaskKind> = Arc::new(ShellCommand::input_output().unwrap());

    let idx = pipeline
        .add_task(
            kind,
            "Copy a",
            Params::new()
                .with("cmd_name", "/bin/cp")
                .with("input", PathBuf::from("/in/a.nii.gz"))
                .with("output", PathBuf::from("/out/a.nii.gz")),
        )
        .unwrap();
    assert_eq!(idx, 0);

    let task = pipeline.task(idx);
    assert_eq!(task.command(), "/bin/cp /in/a.nii.gz /out/a.nii.gz ");
    assert_eq!(task.outputs(), &[PathBuf::from("/out/a.nii.gz")]);
    assert_eq!(task.inputs(), &paths(&["/in/a.nii.gz"]));
    assert_eq!(task.kind_name(), "InputOutputCommand");
    assert!(!task.skip());
    assert!(!task.clobber());
}

#[test]
fn test_kind_declared_outputs_are_used() {
    let (mut pipeline, _fs) = mock_pipeline();
    let robex: Arc<dyn TaskKind> = Arc::new(
        ShellCommand::new("RobexCommand", "runROBEX.sh {input} {output} {out_mask}")
            .unwrap()
            .outputs_from(["output", "out_mask"]),
    );
    let idx = pipeline
        .add_task(
            robex,
            "Skull strip",
            Params::new()
                .with("input", PathBuf::from("/d/t1.nii.gz"))
                .with("output", PathBuf::from("/d/brain.nii.gz"))
                .with("out_mask", PathBuf::from("/d/mask.nii.gz")),
        )
        .unwrap();

    let task = pipeline.task(idx);
    assert_eq!(
        task.outputs(),
        &[PathBuf::from("/d/brain.nii.gz"), PathBuf::from("/d/mask.nii.gz")]
    );
    assert_eq!(task.inputs(), &paths(&["/d/t1.nii.gz"]));
    assert_eq!(task.named_outputs().len(), 2);
}

#[test]
fn test_missing_parameter_is_fatal_and_nothing_registers() {
    let (mut pipeline, _fs) = mock_pipeline();
    let kind: Arc<dyn TaskKind> = Arc::new(ShellCommand::new("Cp", "cp {input} {output}").unwrap());
    let err = pipeline
        .add_task(kind, "broken", Params::new().with("input", "/a"))
        .unwrap_err();
    match err {
        PipebuildError::MissingParameter { kind, param } => {
            assert_eq!(kind, "Cp");
            assert_eq!(param, "output");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(pipeline.tasks().is_empty());
}

#[test]
fn test_task_without_outputs_only_warns() {
    init_tracing();
    let (mut pipeline, _fs) = mock_pipeline();
    let kind: Arc<dyn TaskKind> = Arc::new(ShellCommand::new("Echo", "echo {msg}").unwrap());
    let idx = pipeline
        .add_task(kind, "say hi", Params::new().with("msg", "hi"))
        .unwrap();
    assert!(pipeline.task(idx).outputs().is_empty());
}

#[test]
fn test_clobber_and_skip_flags_are_consumed() {
    let (mut pipeline, _fs) = mock_pipeline();
    let kind: Arc<dyn TaskKind> = Arc::new(ShellCommand::new("Touch", "touch {output}").unwrap());
    let idx = pipeline
        .add_task(
            kind,
            "touch",
            Params::new()
                .with("output", PathBuf::from("/t"))
                .with("clobber", true)
                .with("skip", true),
        )
        .unwrap();

    let task = pipeline.task(idx);
    assert!(task.clobber());
    assert!(task.skip());
    assert!(!task.params().contains("clobber"));
    assert!(!task.params().contains("skip"));

    pipeline.task_mut(idx).set_skip(false);
    assert!(!pipeline.task(idx).skip());
}

#[test]
fn test_kind_defaults_are_overridden_by_params() {
    let (mut pipeline, _fs) = mock_pipeline();
    let kind: Arc<dyn TaskKind> = Arc::new(
        ShellCommand::new("Smooth", "smooth -s {sigma} {input} {output}")
            .unwrap()
            .default_param("sigma", Param::Float(1.5)),
    );
    let a = pipeline
        .add_task(
            Arc::clone(&kind),
            "default sigma",
            Params::new().with("input", "/i").with("output", "/o1"),
        )
        .unwrap();
    let b = pipeline
        .add_task(
            kind,
            "custom sigma",
            Params::new()
                .with("input", "/i")
                .with("output", "/o2")
                .with("sigma", 3i64),
        )
        .unwrap();

    assert_eq!(pipeline.task(a).command(), "smooth -s 1.5 /i /o1");
    assert_eq!(pipeline.task(b).command(), "smooth -s 3 /i /o2");
    assert_eq!(pipeline.task(b).inputs(), &paths(&["/i"]));
}

#[test]
fn test_indices_are_sequential_and_clear_resets() {
    let (mut pipeline, _fs) = mock_pipeline();
    let kind: Arc<dyn TaskKind> = Arc::new(ShellCommand::new("Touch", "touch {output}").unwrap());
    for n in 0..3 {
        let idx = pipeline
            .add_task(
                Arc::clone(&kind),
                format!("t{n}"),
                Params::new().with("output", format!("/t{n}")),
            )
            .unwrap();
        assert_eq!(idx, n);
        assert_eq!(pipeline.task(idx).index(), n);
    }
    pipeline.clear_tasks();
    assert!(pipeline.tasks().is_empty());
}
