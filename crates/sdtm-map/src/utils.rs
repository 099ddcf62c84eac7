//! Utility functions for mapping operations.

use std::collections::{BTreeMap, BTreeSet};

use sdtm_model::{Domain, MappingConfig, MappingSuggestion};

use crate::error::MappingError;

/// Upper-case a header and strip everything but ASCII letters and digits.
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Check that a configuration only names known variables and present columns,
/// and maps each column and variable at most once.
pub fn validate_mapping_config(
    domain: &Domain,
    config: &MappingConfig,
    columns: &[String],
) -> Result<(), MappingError> {
    let mut by_column: BTreeMap<&str, &str> = BTreeMap::new();
    let mut by_variable: BTreeMap<String, &str> = BTreeMap::new();
    for mapping in &config.mappings {
        if domain.variable(&mapping.target_variable).is_none() {
            return Err(MappingError::VariableNotFound(
                mapping.target_variable.clone(),
            ));
        }
        for column in std::iter::once(&mapping.source_column).chain(mapping.code_column.as_ref())
        {
            if !columns.iter().any(|c| c == column) {
                return Err(MappingError::ColumnNotFound(column.clone()));
            }
        }
        if let Some(previous) = by_column.insert(&mapping.source_column, &mapping.target_variable)
        {
            return Err(MappingError::ColumnAlreadyUsed {
                column: mapping.source_column.clone(),
                variable: previous.to_string(),
            });
        }
        let key = mapping.target_variable.to_uppercase();
        if let Some(previous) = by_variable.insert(key, &mapping.source_column) {
            return Err(MappingError::VariableAlreadyMapped {
                variable: mapping.target_variable.clone(),
                column: previous.to_string(),
            });
        }
    }
    Ok(())
}

/// Merges multiple mapping configs for a single domain into one.
///
/// For each target variable the mapping with the highest confidence wins; ties
/// go to the stronger match kind, then the smaller source column name. A source
/// column already claimed by a stronger mapping is not reused.
pub fn merge_mapping_configs(
    domain_code: &str,
    study_id: &str,
    configs: &[MappingConfig],
) -> MappingConfig {
    let mut candidates: Vec<&MappingSuggestion> =
        configs.iter().flat_map(|c| c.mappings.iter()).collect();
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.kind.cmp(&b.kind))
            .then(a.source_column.cmp(&b.source_column))
    });

    let mut targets = BTreeSet::new();
    let mut sources = BTreeSet::new();
    let mut merged = Vec::new();
    for suggestion in candidates {
        let key = suggestion.target_variable.to_uppercase();
        if targets.contains(&key) || sources.contains(&suggestion.source_column) {
            continue;
        }
        targets.insert(key);
        sources.insert(suggestion.source_column.clone());
        merged.push(suggestion.clone());
    }
    merged.sort_by(|a, b| a.target_variable.cmp(&b.target_variable));

    let unmapped: BTreeSet<String> = configs
        .iter()
        .flat_map(|c| c.unmapped_columns.iter())
        .filter(|column| !sources.contains(*column))
        .cloned()
        .collect();

    MappingConfig {
        domain_code: domain_code.to_uppercase(),
        study_id: study_id.to_string(),
        mappings: merged,
        unmapped_columns: unmapped.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdtm_model::{MatchKind, Variable, VariableType};

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header(" Subject Id "), "SUBJECTID");
        assert_eq!(normalize_header("ae_start-date"), "AESTARTDATE");
    }

    #[test]
    fn merge_keeps_best_per_target() {
        let mut weak = MappingSuggestion::new("SEVERITY_TXT", "AESEV", 0.7);
        weak.kind = MatchKind::Fuzzy;
        let first = MappingConfig::new("AE", "S1")
            .with_mapping(weak)
            .with_mapping(MappingSuggestion::new("TERM", "AETERM", 1.0));
        let mut second = MappingConfig::new("AE", "S1")
            .with_mapping(MappingSuggestion::new("SEVERITY", "AESEV", 1.0));
        second.unmapped_columns.push("SEVERITY_TXT".to_string());
        second.unmapped_columns.push("NOTES".to_string());

        let merged = merge_mapping_configs("ae", "S1", &[first, second]);
        assert_eq!(merged.domain_code, "AE");
        assert_eq!(
            merged.mapping_for("AESEV").map(|m| m.source_column.as_str()),
            Some("SEVERITY")
        );
        assert_eq!(merged.mappings.len(), 2);
        assert_eq!(merged.unmapped_columns, vec!["NOTES", "SEVERITY_TXT"]);
    }

    #[test]
    fn validation_rejects_missing_columns_and_duplicates() {
        let domain = Domain::new(
            "AE",
            vec![
                Variable::new("AETERM", VariableType::Char),
                Variable::new("AEDECOD", VariableType::Char),
            ],
        );
        let columns = vec!["TERM".to_string()];
        let ok = MappingConfig::new("AE", "S1")
            .with_mapping(MappingSuggestion::new("TERM", "AETERM", 1.0));
        assert!(validate_mapping_config(&domain, &ok, &columns).is_ok());

        let missing = MappingConfig::new("AE", "S1")
            .with_mapping(MappingSuggestion::new("VERBATIM", "AETERM", 1.0));
        assert_eq!(
            validate_mapping_config(&domain, &missing, &columns),
            Err(MappingError::ColumnNotFound("VERBATIM".to_string()))
        );

        let reused = ok
            .clone()
            .with_mapping(MappingSuggestion::new("TERM", "AEDECOD", 0.9));
        assert!(matches!(
            validate_mapping_config(&domain, &reused, &columns),
            Err(MappingError::ColumnAlreadyUsed { .. })
        ));
    }
}
