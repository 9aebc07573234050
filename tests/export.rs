use std::path::{Path, PathBuf};
use std::sync::Arc;

use pipebuild::dataset::DatasetSpec;
use pipebuild::emit::export::{build_export, write_export, PipelineExport, TASK_INFO_VERSION};
use pipebuild::emit::{command_hash, generate_from_datasets, GenerateOptions, JSON_LIST_FILE};
use pipebuild::fs::FileSystem;
use pipebuild::task::{Params, ShellCommand, TaskKind};
use pipebuild_test_utils::builders::{add_io_task, copy_kind, mock_pipeline};
use pipebuild_test_utils::init_tracing;

/// register (original → xfm), two warps reading xfm, one merge.
fn registration_pipeline() -> (pipebuild::pipeline::Pipeline, pipebuild::fs::mock::MockFileSystem) {
    let (mut pipeline, fs) = mock_pipeline();
    pipeline
        .add_dataset("scans", DatasetSpec::new("/data", "{subj}_{feature}"))
        .unwrap();

    let register = copy_kind("RegisterCommand");
    let warp: Arc<dyn TaskKind> = Arc::new(
        ShellCommand::new("WarpCommand", "warp {moving} {transform} {output}")
            .unwrap()
            .grouping_exempt("moving"),
    );
    let merge: Arc<dyn TaskKind> = Arc::new(ShellCommand::new("MergeCommand", "merge {a} {b} {output}").unwrap());

    add_io_task(&mut pipeline, &register, "register", "/data/s1_t1.nii.gz", "/proc/xfm.mat");
    for feature in ["flair", "dwi"] {
        pipeline
            .add_task(
                Arc::clone(&warp),
                format!("warp {feature}"),
                Params::new()
                    .with("moving", PathBuf::from(format!("/data/s1_{feature}.nii.gz")))
                    .with("transform", PathBuf::from("/proc/xfm.mat"))
                    .with("output", PathBuf::from(format!("/proc/{feature}.nii.gz"))),
            )
            .unwrap();
    }
    pipeline
        .add_task(
            merge,
            "merge",
            Params::new()
                .with("a", PathBuf::from("/proc/flair.nii.gz"))
                .with("b", PathBuf::from("/proc/dwi.nii.gz"))
                .with("output", PathBuf::from("/proc/merged.nii.gz")),
        )
        .unwrap();
    (pipeline, fs)
}

#[test]
fn test_export_structure() {
    init_tracing();
    let (mut pipeline, _fs) = registration_pipeline();
    let export = build_export(&mut pipeline, Path::new("/logs/pb_metadata")).unwrap();

    assert_eq!(export.klasses, vec!["Register", "Warp", "Merge"]);

    assert_eq!(export.supernodes.len(), 3);
    let warp_node = &export.supernodes[1];
    assert_eq!(warp_node.stage, 1);
    assert_eq!(warp_node.height, 0);
    assert_eq!(warp_node.index, 1);
    assert_eq!(warp_node.id, "supernode1");
    assert_eq!(warp_node.class, 1);
    assert_eq!(warp_node.subnodes, vec![1, 2]);

    assert_eq!(export.reverse_mapping.get(&0), Some(&0));
    assert_eq!(export.reverse_mapping.get(&1), Some(&1));
    assert_eq!(export.reverse_mapping.get(&2), Some(&1));
    assert_eq!(export.reverse_mapping.get(&3), Some(&2));

    let links: Vec<(usize, usize, usize)> = export
        .links
        .iter()
        .map(|l| (l.supersource, l.supertarget, l.weight))
        .collect();
    assert_eq!(links, vec![(0, 1, 2), (1, 2, 2)]);
}

#[test]
fn test_subnode_records_and_metadata_prefix() {
    let (mut pipeline, _fs) = registration_pipeline();
    let export = build_export(&mut pipeline, Path::new("/logs/pb_metadata")).unwrap();

    let warp = &export.subnodes[1];
    assert_eq!(warp.name, "warp flair");
    assert_eq!(warp.id, "subnode1");
    assert_eq!(warp.klass, 1);
    assert_eq!(warp.index, 1);
    assert_eq!(warp.supernode, 1);
    assert_eq!(warp.outputs, vec![PathBuf::from("/proc/flair.nii.gz")]);
    assert_eq!(
        warp.named_outfiles.get("output"),
        Some(&PathBuf::from("/proc/flair.nii.gz"))
    );

    let expected_prefix = PathBuf::from("/logs/pb_metadata").join(command_hash(&warp.command_line));
    assert_eq!(warp.metadata_prefix, expected_prefix);
    assert_eq!(pipeline.task(1).metadata_prefix(), Some(expected_prefix.as_path()));

    let info = &warp.task_info;
    assert_eq!(info.version, TASK_INFO_VERSION);
    assert_eq!(info.cmd, warp.command_line);
    assert_eq!(
        info.all_inputs,
        vec![
            PathBuf::from("/data/s1_flair.nii.gz"),
            PathBuf::from("/proc/xfm.mat")
        ]
    );
    assert_eq!(info.original_inputs, vec![PathBuf::from("/data/s1_flair.nii.gz")]);
    assert_eq!(info.intermediate_inputs, vec![PathBuf::from("/proc/xfm.mat")]);
}

#[test]
fn test_export_json_keys() {
    let (mut pipeline, fs) = registration_pipeline();
    write_export(&mut pipeline, Path::new("/logs/p.json"), Path::new("/logs/pb_metadata")).unwrap();

    let text = fs.read_to_string(Path::new("/logs/p.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    for key in ["supernodes", "klasses", "subnodes", "links", "reverse_mapping"] {
        assert!(value.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(value["reverse_mapping"]["3"], 2);
    assert_eq!(value["subnodes"][0]["task_info"]["version"], 1);

    let parsed: PipelineExport = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed.subnodes.len(), 4);
}

#[test]
fn test_zero_weight_links_are_omitted() {
    let (mut pipeline, _fs) = mock_pipeline();
    let kind = copy_kind("CopyCommand");
    add_io_task(&mut pipeline, &kind, "a", "/in/a", "/out/a");
    add_io_task(&mut pipeline, &kind, "b", "/in/b", "/out/b");

    let export = build_export(&mut pipeline, Path::new("/m")).unwrap();
    assert!(export.links.is_empty());
    assert_eq!(export.supernodes.len(), 2);
    assert_eq!(export.klasses, vec!["Copy"]);
}

#[test]
fn test_generate_from_datasets_tracks_exports() {
    init_tracing();
    let (mut pipeline, fs) = registration_pipeline();
    let datasets = pipeline.dataset_ids();
    let options = GenerateOptions {
        log_folder: PathBuf::from("/logs/s1"),
        short_id: "reg".to_string(),
        track: true,
        clobber_existing_outputs: false,
        wrapper: None,
    };

    let artifacts = generate_from_datasets(&mut pipeline, &datasets, &options).unwrap();

    let name = artifacts.script.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("pb_reg."), "{name}");
    assert!(name.ends_with(".sh"), "{name}");
    assert_eq!(artifacts.script.parent(), Some(Path::new("/logs/s1")));
    assert!(fs.is_executable(&artifacts.script));

    let export = artifacts.export.clone().unwrap();
    assert_eq!(export, artifacts.script.with_extension("json"));
    assert!(fs.exists(&export));

    let list = fs.read_to_string(&Path::new("/logs/s1").join(JSON_LIST_FILE)).unwrap();
    assert_eq!(list, format!("{}\n", export.display()));

    let prefix = pipeline.task(0).metadata_prefix().unwrap();
    assert!(prefix.starts_with("/logs/s1/pb_metadata"));
}

#[test]
fn test_generate_without_tracking_writes_only_script() {
    let (mut pipeline, fs) = registration_pipeline();
    let options = GenerateOptions {
        log_folder: PathBuf::from("/logs"),
        short_id: "x".to_string(),
        ..GenerateOptions::default()
    };
    let artifacts = generate_from_datasets(&mut pipeline, &[], &options).unwrap();
    assert!(artifacts.export.is_none());
    assert!(fs.exists(&artifacts.script));
    assert!(!fs.exists(&Path::new("/logs").join(JSON_LIST_FILE)));
    assert_eq!(artifacts.report.dispositions.len(), 4);
}
