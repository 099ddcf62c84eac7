use polars::prelude::{Column, DataFrame};

use sdtm_core::data_utils::{numeric_column, set_string_column, string_column};
use sdtm_core::domain_processors::{COMPLETED, CONSENT, DISPOSITION_EVENT, PROTOCOL_MILESTONE};
use sdtm_core::{
    DomainFrame, DomainProcessor, PipelineContext, ProcessorRegistry, build_domain_frame,
    default_registry,
};
use sdtm_model::{Domain, IssueKind, MappingConfig, MappingSuggestion};
use sdtm_standards::{load_default_ct_registry, load_default_domain_registry};

fn domain(code: &str) -> Domain {
    let registry = load_default_domain_registry().expect("domains");
    registry.get(code).expect("domain").clone()
}

fn config(domain: &str, pairs: &[(&str, &str)]) -> MappingConfig {
    pairs.iter().fold(
        MappingConfig::new(domain, "STUDY01"),
        |config, (source, target)| config.with_mapping(MappingSuggestion::new(*source, *target, 1.0)),
    )
}

fn text(frame: &DomainFrame, column: &str) -> Vec<String> {
    string_column(&frame.data, column).expect(column)
}

#[test]
fn builtin_registry_covers_core_domains() {
    let registry = default_registry();
    let codes: Vec<&str> = registry.domain_codes().collect();
    assert_eq!(codes, vec!["AE", "CM", "DM", "DS", "EX", "LB", "MH", "VS"]);
    assert_eq!(registry.get(" vs ").domain_code(), "VS");
    assert_eq!(registry.get("QS").domain_code(), "*");
}

#[test]
fn demographics_defaults_sex_and_collapses_subjects() {
    let dm = domain("DM");
    let ct = load_default_ct_registry().expect("ct");
    let source = DataFrame::new(vec![
        Column::new("SUBJ".into(), ["001", "002", "003", "001"]),
        Column::new("SITE".into(), ["10", "10", "20", "10"]),
        Column::new("GENDER".into(), ["Female", "", "X", "Female"]),
        Column::new("CNTRY".into(), ["usa", "deu", "fra", "usa"]),
        Column::new("AGE".into(), ["34", "51", "", "34"]),
    ])
    .expect("df");
    let config = config(
        "DM",
        &[
            ("SUBJ", "SUBJID"),
            ("SITE", "SITEID"),
            ("GENDER", "SEX"),
            ("CNTRY", "COUNTRY"),
            ("AGE", "AGE"),
        ],
    );
    let context = PipelineContext::new("STUDY01").with_terminology(&ct);

    let frame = build_domain_frame(&dm, &source, &config, &context).expect("build");

    assert_eq!(frame.record_count(), 3);
    assert_eq!(
        text(&frame, "USUBJID"),
        vec!["STUDY01-001", "STUDY01-002", "STUDY01-003"]
    );
    assert_eq!(text(&frame, "SEX"), vec!["F", "U", "U"]);
    assert_eq!(text(&frame, "COUNTRY"), vec!["USA", "DEU", "FRA"]);
    assert_eq!(
        numeric_column(&frame.data, "AGE").expect("AGE"),
        vec![Some(34.0), Some(51.0), None]
    );
    assert_eq!(text(&frame, "AGEU"), vec!["YEARS", "YEARS", ""]);
    assert!(frame.data.column("DMSEQ").is_err());
    assert_eq!(frame.issues.count_of(IssueKind::VocabularyViolation), 1);
}

#[test]
fn disposition_gains_companion_rows() {
    let ds = domain("DS");
    let ct = load_default_ct_registry().expect("ct");
    let source = DataFrame::new(vec![
        Column::new("SUBJECT".into(), ["S01", "S02"]),
        Column::new("EVENT".into(), ["Randomized", "Informed consent"]),
        Column::new("DATE".into(), ["2023-01-02", "2023-01-01"]),
    ])
    .expect("df");
    let config = config(
        "DS",
        &[("SUBJECT", "USUBJID"), ("EVENT", "DSTERM"), ("DATE", "DSSTDTC")],
    );
    let context = PipelineContext::new("STUDY01").with_terminology(&ct);

    let frame = build_domain_frame(&ds, &source, &config, &context).expect("build");

    assert_eq!(
        text(&frame, "USUBJID"),
        vec!["S01", "S01", "S01", "S02", "S02"]
    );
    assert_eq!(
        text(&frame, "DSDECOD"),
        vec!["RANDOMIZED", CONSENT, COMPLETED, CONSENT, COMPLETED]
    );
    assert_eq!(
        text(&frame, "DSCAT"),
        vec![
            PROTOCOL_MILESTONE,
            PROTOCOL_MILESTONE,
            DISPOSITION_EVENT,
            PROTOCOL_MILESTONE,
            DISPOSITION_EVENT,
        ]
    );
    assert_eq!(text(&frame, "STUDYID"), vec!["STUDY01"; 5]);
    assert_eq!(
        frame.source_rows,
        vec![Some(0), None, None, Some(1), None]
    );
    assert_eq!(frame.synthesized_rows(), vec![1, 2, 4]);
    assert_eq!(
        numeric_column(&frame.data, "DSSEQ").expect("DSSEQ"),
        vec![Some(1.0), Some(2.0), Some(3.0), Some(1.0), Some(2.0)]
    );
}

#[test]
fn vital_signs_pair_test_codes_and_names() {
    let vs = domain("VS");
    let ct = load_default_ct_registry().expect("ct");
    let source = DataFrame::new(vec![
        Column::new("SUBJECT".into(), ["S01", "S01", "S01"]),
        Column::new("CODE".into(), ["SYSBP", "", "TEMP"]),
        Column::new("NAME".into(), ["", "Pulse Rate", ""]),
        Column::new("RESULT".into(), ["120", "72", ""]),
        Column::new("REASON".into(), ["", "", "Refused"]),
        Column::new("DATE".into(), ["2023-01-01", "2023-01-02", "2023-01-03"]),
    ])
    .expect("df");
    let config = config(
        "VS",
        &[
            ("SUBJECT", "USUBJID"),
            ("CODE", "VSTESTCD"),
            ("NAME", "VSTEST"),
            ("RESULT", "VSORRES"),
            ("REASON", "VSREASND"),
            ("DATE", "VSDTC"),
        ],
    );
    let context = PipelineContext::new("STUDY01").with_terminology(&ct);

    let frame = build_domain_frame(&vs, &source, &config, &context).expect("build");

    assert_eq!(text(&frame, "VSTESTCD"), vec!["SYSBP", "PULSE", "TEMP"]);
    assert_eq!(
        text(&frame, "VSTEST"),
        vec!["Systolic Blood Pressure", "Pulse Rate", "Temperature"]
    );
    assert_eq!(text(&frame, "VSSTRESC"), vec!["120", "72", ""]);
    assert_eq!(
        numeric_column(&frame.data, "VSSTRESN").expect("VSSTRESN"),
        vec![Some(120.0), Some(72.0), None]
    );
    assert_eq!(text(&frame, "VSSTAT"), vec!["", "", "NOT DONE"]);
}

struct FlaggingProcessor;

impl DomainProcessor for FlaggingProcessor {
    fn domain_code(&self) -> &'static str {
        "AE"
    }

    fn process(
        &self,
        _domain: &Domain,
        df: &mut DataFrame,
        _context: &PipelineContext,
    ) -> anyhow::Result<()> {
        set_string_column(df, "AEBODSYS", vec!["FLAGGED".to_string(); df.height()])
    }
}

#[test]
fn registered_processor_replaces_builtin() {
    let ae = domain("AE");
    let mut registry = ProcessorRegistry::with_builtin();
    registry.register(Box::new(FlaggingProcessor));
    let source = DataFrame::new(vec![
        Column::new("SUBJECT".into(), ["S01", "S01"]),
        Column::new("TERM".into(), ["HEADACHE", "NAUSEA"]),
        Column::new("DECOD".into(), ["Headache", "Nausea"]),
    ])
    .expect("df");
    let config = config(
        "AE",
        &[("SUBJECT", "USUBJID"), ("TERM", "AETERM"), ("DECOD", "AEDECOD")],
    );
    let context = PipelineContext::new("STUDY01").with_processors(&registry);

    let frame = build_domain_frame(&ae, &source, &config, &context).expect("build");

    assert_eq!(text(&frame, "AEBODSYS"), vec!["FLAGGED", "FLAGGED"]);
    // Sequence stays dense even when a processor does not number rows.
    assert_eq!(
        numeric_column(&frame.data, "AESEQ").expect("AESEQ"),
        vec![Some(1.0), Some(2.0)]
    );
}
