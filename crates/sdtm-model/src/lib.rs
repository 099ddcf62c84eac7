#![deny(unsafe_code)]

pub mod ct;
pub mod domain;
pub mod error;
pub mod issues;
pub mod mapping;
pub mod metadata;
pub mod options;
pub mod suppqual;

pub use ct::{Codelist, PackageInfo, Term, TerminologyCatalog, TerminologyRegistry};
pub use domain::{
    CoreDesignation, DEFAULT_CHAR_LENGTH, DatasetClass, DatasetMetadata, Domain, Variable,
    VariableType,
};
pub use error::{ModelError, Result};
pub use issues::{BuildIssue, IssueKind, IssueLog};
pub use mapping::{ColumnHint, MappingConfig, MappingSuggestion, MatchKind};
pub use metadata::{SourceColumn, StudyCodelist, StudyMetadata};
pub use options::{
    DEFAULT_KEEP_VARIABLES, DEFAULT_MIN_CONFIDENCE, ProcessingOptions, SuppqualOptions,
};
pub use suppqual::{SUPPQUAL_VARIABLES, SuppqualRecord};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_log_counts_by_kind() {
        let mut log = IssueLog::new("AE");
        log.push(BuildIssue::new(
            IssueKind::LengthOverflow,
            Some("AETERM"),
            2,
            "truncated".to_string(),
        ));
        log.push(BuildIssue::new(
            IssueKind::VocabularyViolation,
            Some("AESEV"),
            1,
            "outside codelist".to_string(),
        ));
        assert_eq!(log.count_of(IssueKind::LengthOverflow), 2);
        assert_eq!(log.count_of(IssueKind::SequenceCollision), 0);
        assert_eq!(log.of_kind(IssueKind::VocabularyViolation).count(), 1);
    }

    #[test]
    fn mapping_config_serializes() {
        let config = MappingConfig::new("ae", "STUDY").with_mapping(
            MappingSuggestion::new("SEVERITY", "AESEV", 1.0)
                .with_vocabulary("C66769", None),
        );
        let json = serde_json::to_string(&config).expect("serialize config");
        let round: MappingConfig = serde_json::from_str(&json).expect("deserialize config");
        assert_eq!(round.domain_code, "AE");
        assert_eq!(round.mappings[0].vocabulary.as_deref(), Some("C66769"));
    }
}
