//! Tests for sdtm-model types.

use sdtm_model::{
    CoreDesignation, DatasetClass, Domain, MappingConfig, MappingSuggestion, StudyCodelist,
    StudyMetadata, SourceColumn, SuppqualRecord, SUPPQUAL_VARIABLES, Variable, VariableType,
};

fn ae_domain() -> Domain {
    Domain::new(
        "ae",
        vec![
            Variable::new("STUDYID", VariableType::Char).with_core(CoreDesignation::Required),
            Variable::new("AESEQ", VariableType::Num).with_core(CoreDesignation::Required),
            Variable::new("AETERM", VariableType::Char).with_core(CoreDesignation::Required),
            Variable::new("AESTDTC", VariableType::Char).with_core(CoreDesignation::Expected),
            Variable::new("AEDUR", VariableType::Char).with_core(CoreDesignation::Permissible),
            Variable::new("AESEV", VariableType::Char)
                .with_codelist("C66769; C99999")
                .with_length(8),
        ],
    )
    .with_class(DatasetClass::Events)
}

#[test]
fn domain_resolves_prefixed_names() {
    let domain = ae_domain();
    assert_eq!(domain.code, "AE");
    assert_eq!(domain.column_name("--SEQ"), Some("AESEQ"));
    assert_eq!(domain.column_name("aeterm"), Some("AETERM"));
    assert_eq!(domain.infer_seq_column(), Some("AESEQ"));
    assert_eq!(domain.variable_suffix("AESEV"), Some("SEV"));
    assert_eq!(domain.variable_suffix("STUDYID"), None);
    assert!(domain.is_general_observation());
    assert!(!domain.is_findings());
}

#[test]
fn variable_helpers() {
    let domain = ae_domain();
    let required: Vec<&str> = domain
        .required_variables()
        .map(|v| v.name.as_str())
        .collect();
    assert_eq!(required, vec!["STUDYID", "AESEQ", "AETERM"]);

    let sev = domain.variable("AESEV").expect("AESEV");
    assert_eq!(sev.codelist_codes(), vec!["C66769", "C99999"]);
    assert_eq!(sev.max_length(), 8);
    assert_eq!(domain.variable("AETERM").expect("AETERM").max_length(), 200);

    assert!(domain.variable("AESTDTC").expect("AESTDTC").is_date_like());
    assert!(domain.variable("AEDUR").expect("AEDUR").is_duration_like());
    assert!(!domain.variable("AESEQ").expect("AESEQ").is_date_like());
}

#[test]
fn dataset_class_parsing() {
    assert_eq!(
        "special-purpose".parse::<DatasetClass>().expect("class"),
        DatasetClass::SpecialPurpose
    );
    assert!("Nonsense".parse::<DatasetClass>().is_err());
    assert_eq!(
        "Perm".parse::<CoreDesignation>().expect("core"),
        CoreDesignation::Permissible
    );
}

#[test]
fn study_codelist_decodes_numeric_codes() {
    let codelist = StudyCodelist::new("SEXF").with_value("1", "Male").with_value("2", "Female");
    assert_eq!(codelist.lookup_text("1.0").as_deref(), Some("Male"));
    assert_eq!(codelist.lookup_text(" 2 ").as_deref(), Some("Female"));
    assert_eq!(codelist.lookup_text("3"), None);

    let mut metadata = StudyMetadata::default();
    metadata.add_codelist(codelist);
    metadata.add_item(SourceColumn::new("SEX_CD", "Sex code").with_format("SEXF"));
    assert!(metadata.codelist("sexf").is_some());
    assert_eq!(
        metadata
            .item("sex_cd")
            .and_then(|item| item.format_name.as_deref()),
        Some("SEXF")
    );
}

#[test]
fn mapping_config_used_columns_include_code_columns() {
    let config = MappingConfig::new("DM", "STUDY01")
        .with_mapping(MappingSuggestion::new("SUBJECT", "USUBJID", 1.0))
        .with_mapping(
            MappingSuggestion::new("SEX", "SEX", 1.0)
                .with_vocabulary("SEXF", Some("SEX_CD".to_string())),
        );
    let used: Vec<String> = config.used_source_columns().into_iter().collect();
    assert_eq!(used, vec!["SEX", "SEX_CD", "SUBJECT"]);
    assert!(config.mapping_for("usubjid").is_some());
}

#[test]
fn suppqual_record_values_follow_variable_order() {
    let record = SuppqualRecord {
        studyid: "S1".into(),
        rdomain: "AE".into(),
        usubjid: "S1-001".into(),
        idvar: "AESEQ".into(),
        idvarval: "1".into(),
        qnam: "AEFOO".into(),
        qlabel: "Foo".into(),
        qval: "bar".into(),
        qorig: "CRF".into(),
        qeval: String::new(),
    };
    assert_eq!(SUPPQUAL_VARIABLES.len(), record.values().len());
    assert_eq!(record.values()[5], "AEFOO");
}
