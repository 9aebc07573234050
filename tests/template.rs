use pipebuild::errors::PipebuildError;
use pipebuild::template::{fields, Template};

#[test]
fn test_fields_in_order_of_first_appearance() {
    let t = Template::parse("{subj}/{feature}_{subj}{extension}").unwrap();
    assert_eq!(t.fields(), &["subj", "feature", "extension"]);
}

#[test]
fn test_render_fills_every_occurrence() {
    let t = Template::parse("/data/{subj}/{feature}_{subj}.nii").unwrap();
    let out = t
        .render(&fields([("subj", "s01"), ("feature", "t1")]))
        .unwrap();
    assert_eq!(out, "/data/s01/t1_s01.nii");
}

#[test]
fn test_double_braces_are_literal() {
    let t = Template::parse("awk '{{print $1}}' {input}").unwrap();
    assert_eq!(t.fields(), &["input"]);
    let out = t.render(&fields([("input", "/a.txt")])).unwrap();
    assert_eq!(out, "awk '{print $1}' /a.txt");
}

#[test]
fn test_missing_field_is_reported() {
    let t = Template::parse("{a}-{b}").unwrap();
    let err = t.render(&fields([("a", "1")])).unwrap_err();
    match err {
        PipebuildError::MissingField { field, .. } => assert_eq!(field, "b"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_malformed_templates_are_rejected() {
    for raw in ["{}", "{0}", "{x:>3}", "{open", "close}"] {
        let err = Template::parse(raw).unwrap_err();
        assert!(
            matches!(err, PipebuildError::MalformedTemplate { .. }),
            "{raw} gave {err:?}"
        );
    }
}

#[test]
fn test_matches_only_renderings() {
    let t = Template::parse("/data/{subj}/raw_{feature}.nii.gz").unwrap();
    assert!(t.matches("/data/s01/raw_t1.nii.gz"));
    assert!(t.matches("/data/%/raw_%.nii.gz"));
    assert!(!t.matches("/data/s01/proc_t1.nii.gz"));
    assert!(!t.matches("/elsewhere/data/s01/raw_t1.nii.gz"));
}

#[test]
fn test_literal_regex_characters_are_escaped() {
    let t = Template::parse("/d/{x}.nii.gz").unwrap();
    assert!(t.matches("/d/a.nii.gz"));
    assert!(!t.matches("/d/aXniiXgz"));
}
