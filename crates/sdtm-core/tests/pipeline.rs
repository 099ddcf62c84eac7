use std::collections::BTreeMap;

use polars::prelude::{Column, DataFrame};

use sdtm_core::data_utils::{numeric_column, string_column};
use sdtm_core::{BuildError, DomainFrame, PipelineContext, build_domain_frame};
use sdtm_model::{
    Domain, IssueKind, MappingConfig, MappingSuggestion, ProcessingOptions, TerminologyRegistry,
};
use sdtm_standards::{load_default_ct_registry, load_default_domain_registry};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn domain(code: &str) -> Domain {
    let registry = load_default_domain_registry().expect("domains");
    registry.get(code).expect("domain").clone()
}

fn terminology() -> TerminologyRegistry {
    load_default_ct_registry().expect("ct")
}

fn config(domain: &str, pairs: &[(&str, &str)]) -> MappingConfig {
    pairs.iter().fold(
        MappingConfig::new(domain, "STUDY01"),
        |config, (source, target)| config.with_mapping(MappingSuggestion::new(*source, *target, 1.0)),
    )
}

fn ae_source(subjects: &[&str], terms: &[&str], starts: &[&str]) -> DataFrame {
    DataFrame::new(vec![
        Column::new("SUBJECT".into(), subjects),
        Column::new("TERM".into(), terms),
        Column::new("START".into(), starts),
    ])
    .expect("df")
}

fn ae_config() -> MappingConfig {
    config(
        "AE",
        &[("SUBJECT", "USUBJID"), ("TERM", "AETERM"), ("START", "AESTDTC")],
    )
}

fn text(frame: &DomainFrame, column: &str) -> Vec<String> {
    string_column(&frame.data, column).expect(column)
}

fn numbers(frame: &DomainFrame, column: &str) -> Vec<Option<f64>> {
    numeric_column(&frame.data, column).expect(column)
}

#[test]
fn study_day_has_no_day_zero() {
    init_tracing();
    let ae = domain("AE");
    let source = ae_source(
        &["S01", "S01"],
        &["HEADACHE", "NAUSEA"],
        &["2023-01-01", "31-DEC-2022"],
    );
    let starts = BTreeMap::from([("S01".to_string(), "2023-01-01".to_string())]);
    let context = PipelineContext::new("STUDY01").with_reference_starts(starts);

    let frame = build_domain_frame(&ae, &source, &ae_config(), &context).expect("build");

    assert_eq!(text(&frame, "AESTDTC"), vec!["2022-12-31", "2023-01-01"]);
    assert_eq!(numbers(&frame, "AESTDY"), vec![Some(-1.0), Some(1.0)]);
    assert_eq!(numbers(&frame, "AESEQ"), vec![Some(1.0), Some(2.0)]);
    assert_eq!(frame.source_rows, vec![Some(1), Some(0)]);
}

#[test]
fn identifiers_are_populated() {
    let ae = domain("AE");
    let source = ae_source(&["S01"], &["Headache"], &["2023-01-05"]);
    let frame = build_domain_frame(&ae, &source, &ae_config(), &PipelineContext::new("IGNORED"))
        .expect("build");

    assert_eq!(text(&frame, "STUDYID"), vec!["STUDY01"]);
    assert_eq!(text(&frame, "DOMAIN"), vec!["AE"]);
    assert_eq!(text(&frame, "AEDECOD"), vec!["Headache"]);
}

#[test]
fn identical_inputs_build_identical_frames() {
    let ae = domain("AE");
    let ct = terminology();
    let context = PipelineContext::new("STUDY01").with_terminology(&ct);
    let source = ae_source(
        &["S02", "S01", "S01"],
        &["RASH", "NAUSEA", "HEADACHE"],
        &["2023-02-01", "2023-01-03", "2023-01-03"],
    );

    let first = build_domain_frame(&ae, &source, &ae_config(), &context).expect("first");
    let second = build_domain_frame(&ae, &source, &ae_config(), &context).expect("second");

    assert!(first.data.equals_missing(&second.data));
    assert_eq!(first.source_rows, second.source_rows);
    assert_eq!(first.column_names(), second.column_names());
}

#[test]
fn missing_required_value_fails_unless_lenient() {
    let ae = domain("AE");
    let source = ae_source(&["S01", "S01"], &["HEADACHE", ""], &["2023-01-01", "2023-01-02"]);

    let error = build_domain_frame(&ae, &source, &ae_config(), &PipelineContext::new("STUDY01"))
        .expect_err("required AETERM is blank");
    let build_error = error.downcast_ref::<BuildError>().expect("build error");
    assert!(matches!(build_error, BuildError::RequiredValueMissing { .. }));
    assert_eq!(build_error.missing_variables(), vec!["AETERM", "AEDECOD"]);

    let lenient = PipelineContext::new("STUDY01").with_options(ProcessingOptions::lenient());
    let frame = build_domain_frame(&ae, &source, &ae_config(), &lenient).expect("lenient build");
    assert_eq!(frame.record_count(), 2);
}

#[test]
fn absent_source_column_is_a_build_error() {
    let ae = domain("AE");
    let source = ae_source(&["S01"], &["HEADACHE"], &["2023-01-01"]);
    let config = ae_config().with_mapping(MappingSuggestion::new("GONE", "AEOUT", 1.0));

    let error = build_domain_frame(&ae, &source, &config, &PipelineContext::new("STUDY01"))
        .expect_err("GONE is not a source column");
    match error.downcast_ref::<BuildError>() {
        Some(BuildError::MissingSourceColumn { column, variable, .. }) => {
            assert_eq!(column, "GONE");
            assert_eq!(variable, "AEOUT");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn long_text_is_truncated_and_reported() {
    let ae = domain("AE");
    let long = "A".repeat(250);
    let source = ae_source(&["S01"], &[long.as_str()], &["2023-01-01"]);

    let frame = build_domain_frame(&ae, &source, &ae_config(), &PipelineContext::new("STUDY01"))
        .expect("build");

    let term = &text(&frame, "AETERM")[0];
    assert_eq!(term.chars().count(), 200);
    let truncated: Vec<&str> = frame
        .issues
        .of_kind(IssueKind::LengthOverflow)
        .filter_map(|issue| issue.variable.as_deref())
        .collect();
    assert!(truncated.contains(&"AETERM"));
}

#[test]
fn colliding_source_sequence_is_regenerated() {
    let ae = domain("AE");
    let source = DataFrame::new(vec![
        Column::new("SUBJECT".into(), ["S01", "S01", "S02"]),
        Column::new("TERM".into(), ["HEADACHE", "NAUSEA", "RASH"]),
        Column::new("START".into(), ["2023-01-01", "2023-01-02", "2023-01-01"]),
        Column::new("SEQ".into(), [1.0, 1.0, 7.0]),
    ])
    .expect("df");
    let config = ae_config().with_mapping(MappingSuggestion::new("SEQ", "AESEQ", 1.0));

    let frame = build_domain_frame(&ae, &source, &config, &PipelineContext::new("STUDY01"))
        .expect("build");

    assert_eq!(text(&frame, "USUBJID"), vec!["S01", "S01", "S02"]);
    assert_eq!(
        numbers(&frame, "AESEQ"),
        vec![Some(1.0), Some(2.0), Some(1.0)]
    );
    assert_eq!(frame.issues.count_of(IssueKind::SequenceCollision), 1);
}

#[test]
fn severity_outside_vocabulary_defaults_to_mild() {
    let ae = domain("AE");
    let ct = terminology();
    let source = DataFrame::new(vec![
        Column::new("SUBJECT".into(), ["S01", "S01", "S01"]),
        Column::new("TERM".into(), ["HEADACHE", "NAUSEA", "RASH"]),
        Column::new("START".into(), ["2023-01-01", "2023-01-02", "2023-01-03"]),
        Column::new("SEV".into(), ["Grade 3", "EXTREME", ""]),
        Column::new("SERIOUS".into(), ["yes", "No", ""]),
    ])
    .expect("df");
    let config = ae_config()
        .with_mapping(MappingSuggestion::new("SEV", "AESEV", 1.0))
        .with_mapping(MappingSuggestion::new("SERIOUS", "AESER", 1.0));
    let context = PipelineContext::new("STUDY01").with_terminology(&ct);

    let frame = build_domain_frame(&ae, &source, &config, &context).expect("build");

    assert_eq!(text(&frame, "AESEV"), vec!["SEVERE", "MILD", ""]);
    assert_eq!(text(&frame, "AESER"), vec!["Y", "N", ""]);
    assert_eq!(frame.issues.count_of(IssueKind::VocabularyViolation), 1);
}

#[test]
fn unparsable_dates_and_durations_are_cleared() {
    let ae = domain("AE");
    let source = DataFrame::new(vec![
        Column::new("SUBJECT".into(), ["S01", "S01"]),
        Column::new("TERM".into(), ["HEADACHE", "NAUSEA"]),
        Column::new("START".into(), ["sometime", "2023-01-02 08:30"]),
        Column::new("LASTED".into(), ["3 days", "a while"]),
    ])
    .expect("df");
    let config = ae_config().with_mapping(MappingSuggestion::new("LASTED", "AEDUR", 1.0));

    let frame = build_domain_frame(&ae, &source, &config, &PipelineContext::new("STUDY01"))
        .expect("build");

    // Blank start dates sort after present ones.
    assert_eq!(text(&frame, "AESTDTC"), vec!["2023-01-02T08:30", ""]);
    assert_eq!(text(&frame, "AEDUR"), vec!["", "P3D"]);
}

#[test]
fn columns_follow_declared_order() {
    let ae = domain("AE");
    let source = ae_source(&["S01"], &["HEADACHE"], &["2023-01-01"]);

    let frame = build_domain_frame(&ae, &source, &ae_config(), &PipelineContext::new("STUDY01"))
        .expect("build");

    insta::assert_snapshot!(
        frame.column_names().join(","),
        @"STUDYID,DOMAIN,USUBJID,AESEQ,AETERM,AEDECOD,AEBODSYS,AESER,AEACN,AEREL,EPOCH,AESTDTC,AEENDTC"
    );
}
