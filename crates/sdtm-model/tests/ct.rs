//! Tests for Controlled Terminology types.

use proptest::prelude::*;
use sdtm_model::{Codelist, Term, TerminologyCatalog, TerminologyRegistry};

fn term(code: &str, value: &str, synonyms: &[&str]) -> Term {
    Term {
        code: code.to_string(),
        submission_value: value.to_string(),
        synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        definition: None,
        preferred_term: None,
    }
}

fn sex_codelist() -> Codelist {
    let mut sex = Codelist::new("C66731".to_string(), "Sex".to_string(), false);
    sex.add_term(term("C16576", "F", &["Female"]));
    sex.add_term(term("C20197", "M", &["Male"]));
    sex.add_term(term("C17998", "U", &["UNK", "Unknown"]));
    sex
}

#[test]
fn test_codelist_validation() {
    let sex = sex_codelist();

    assert!(sex.is_valid("M"));
    assert!(sex.is_valid("m"));
    assert!(sex.is_valid("Female"));
    assert!(sex.is_valid("Unknown"));

    assert!(!sex.is_valid("X"));
    assert!(!sex.is_valid(""));
}

#[test]
fn test_codelist_normalization() {
    let sex = sex_codelist();

    assert_eq!(sex.normalize("UNK"), "U");
    assert_eq!(sex.normalize(" male "), "M");
    assert_eq!(sex.normalize("u"), "U");
    assert_eq!(sex.normalize(" OTHER "), "OTHER");
}

#[test]
fn test_invalid_values_respect_extensibility() {
    let sex = sex_codelist();
    let invalid = sex.invalid_values(["M", "Female", "X", "", "x"]);
    assert_eq!(invalid.into_iter().collect::<Vec<_>>(), vec!["X", "x"]);

    let mut unit = Codelist::new("C71620".to_string(), "Unit".to_string(), true);
    unit.add_term(term("C48155", "g", &["gram"]));
    assert!(unit.invalid_values(["furlong"]).is_empty());
}

#[test]
fn test_nci_code_lookup() {
    let sex = sex_codelist();
    assert_eq!(sex.nci_code("Female"), Some("C16576"));
    assert_eq!(sex.nci_code("X"), None);
    assert_eq!(
        sex.term_for_code("c20197").map(|t| t.submission_value.as_str()),
        Some("M")
    );
}

#[test]
fn test_registry_tracks_packages_and_clears() {
    let mut catalog = TerminologyCatalog::new(
        "SDTM CT".to_string(),
        Some("2024-03-29".to_string()),
        Some("SDTM".to_string()),
    );
    catalog.add_codelist(sex_codelist());

    let mut registry = TerminologyRegistry::new();
    registry.add_package(catalog);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.packages().len(), 1);
    assert_eq!(registry.packages()[0].codelist_count, 1);
    assert_eq!(registry.normalize("Sex", "female").as_deref(), Some("F"));
    assert_eq!(registry.normalize("C99999", "female"), None);
    assert_eq!(registry.nci_code("C66731", "M"), Some("C20197"));

    registry.clear();
    assert!(registry.is_empty());
    assert!(registry.packages().is_empty());
}

proptest! {
    #[test]
    fn normalize_is_idempotent(raw in "[ A-Za-z]{0,12}") {
        let sex = sex_codelist();
        let once = sex.normalize(&raw);
        prop_assert_eq!(sex.normalize(&once), once.clone());
    }
}
