use std::collections::BTreeMap;

use polars::prelude::{Column, DataFrame};

use sdtm_core::data_utils::{numeric_column, string_column};
use sdtm_core::{DomainFrame, PipelineContext, build_mapped_domain_frame, extract_suppqual};
use sdtm_model::Domain;
use sdtm_standards::{load_default_ct_registry, load_default_domain_registry};

fn domain(code: &str) -> Domain {
    let registry = load_default_domain_registry().expect("domains");
    registry.get(code).expect("domain").clone()
}

fn text(frame: &DomainFrame, column: &str) -> Vec<String> {
    string_column(&frame.data, column).expect(column)
}

fn numbers(frame: &DomainFrame, column: &str) -> Vec<Option<f64>> {
    numeric_column(&frame.data, column).expect(column)
}

fn starts(subject: &str, date: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(subject.to_string(), date.to_string())])
}

#[test]
fn padded_and_mixed_case_headers_build() {
    let ae = domain("AE");
    let ct = load_default_ct_registry().expect("ct");
    let source = DataFrame::new(vec![
        Column::new("Subject Id ".into(), ["S01", "S01"]),
        Column::new(" aeTerm".into(), ["HEADACHE", "NAUSEA"]),
        Column::new("AESTDTC ".into(), ["2023-01-05", "05-JAN-2023"]),
        Column::new("Blood Type ".into(), ["A+", ""]),
    ])
    .expect("df");
    let context = PipelineContext::new("STUDY01")
        .with_terminology(&ct)
        .with_reference_starts(starts("S01", "2023-01-01"));

    let mapped = build_mapped_domain_frame(&ae, &source, 0.8, &context).expect("build");

    let sources: BTreeMap<&str, &str> = mapped
        .config
        .mappings
        .iter()
        .map(|m| (m.target_variable.as_str(), m.source_column.as_str()))
        .collect();
    assert_eq!(sources.get("USUBJID"), Some(&"Subject Id "));
    assert_eq!(sources.get("AETERM"), Some(&" aeTerm"));
    assert_eq!(sources.get("AESTDTC"), Some(&"AESTDTC "));

    let frame = &mapped.frame;
    assert_eq!(text(frame, "USUBJID"), vec!["S01", "S01"]);
    assert_eq!(text(frame, "AESTDTC"), vec!["2023-01-05", "2023-01-05"]);
    assert_eq!(numbers(frame, "AESTDY"), vec![Some(5.0), Some(5.0)]);

    let result = extract_suppqual(&ae, &source, frame, &mapped.used_columns, None, &context)
        .expect("extract")
        .expect("qualifiers");
    assert_eq!(result.used_columns, vec!["Blood Type "]);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].qnam, "BLOODTYP");
    assert_eq!(result.records[0].qval, "A+");
}

#[test]
fn filled_exposure_end_date_gets_a_study_day() {
    let ex = domain("EX");
    let source = DataFrame::new(vec![
        Column::new("Subject Id ".into(), ["S01", "S01"]),
        Column::new("extrt".into(), ["DRUG A", "DRUG A"]),
        Column::new(" ExStDtc".into(), ["2023-01-05", "2023-01-08"]),
        Column::new("EXENDTC".into(), ["", "2023-01-10"]),
    ])
    .expect("df");
    let context =
        PipelineContext::new("STUDY01").with_reference_starts(starts("S01", "2023-01-01"));

    let mapped = build_mapped_domain_frame(&ex, &source, 0.8, &context).expect("build");

    let frame = &mapped.frame;
    assert_eq!(text(frame, "EXENDTC"), vec!["2023-01-05", "2023-01-10"]);
    assert_eq!(numbers(frame, "EXSTDY"), vec![Some(5.0), Some(8.0)]);
    assert_eq!(numbers(frame, "EXENDY"), vec![Some(5.0), Some(10.0)]);
}

#[test]
fn study_day_follows_unnormalized_reference_start() {
    let ae = domain("AE");
    let source = DataFrame::new(vec![
        Column::new("SUBJECT ID".into(), ["S01"]),
        Column::new("AETERM".into(), ["HEADACHE"]),
        Column::new("aestdtc".into(), ["2023-01-09T08:00Z"]),
    ])
    .expect("df");
    let context =
        PipelineContext::new("STUDY01").with_reference_starts(starts("S01", "01/05/2023"));

    let mapped = build_mapped_domain_frame(&ae, &source, 0.8, &context).expect("build");

    assert_eq!(text(&mapped.frame, "AESTDTC"), vec!["2023-01-09T08:00"]);
    assert_eq!(numbers(&mapped.frame, "AESTDY"), vec![Some(5.0)]);
}
