//! Column mapping types for source-to-SDTM variable mapping.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Hints about a source column's characteristics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnHint {
    /// True if the column contains numeric values.
    pub is_numeric: bool,
    /// Ratio of unique values to total rows (0.0 to 1.0).
    pub unique_ratio: f64,
    /// Ratio of null/missing values to total rows (0.0 to 1.0).
    pub null_ratio: f64,
    /// Optional label/description from source metadata.
    pub label: Option<String>,
}

/// How a mapping was found. Variants are ordered strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Declared in study override metadata.
    Declared,
    /// Normalized header equals the variable name.
    Exact,
    /// Category-specific synonym for the variable suffix.
    Suffix,
    /// Shared identifier/timing alias.
    Generic,
    /// Token-set similarity.
    Fuzzy,
}

/// A suggested mapping from source column to SDTM variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSuggestion {
    pub source_column: String,
    pub target_variable: String,
    /// Confidence score (0.0 to 1.0).
    pub confidence: f32,
    /// Optional transformation to apply (e.g., "uppercase").
    pub transformation: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: MatchKind,
    /// Vocabulary (study format name, codelist name or code) applied to the values.
    #[serde(default)]
    pub vocabulary: Option<String>,
    /// Source column holding raw codes the vocabulary decodes.
    #[serde(default)]
    pub code_column: Option<String>,
}

fn default_kind() -> MatchKind {
    MatchKind::Fuzzy
}

impl MappingSuggestion {
    pub fn new(
        source_column: impl Into<String>,
        target_variable: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            source_column: source_column.into(),
            target_variable: target_variable.into(),
            confidence,
            transformation: None,
            kind: MatchKind::Exact,
            vocabulary: None,
            code_column: None,
        }
    }

    pub fn with_vocabulary(
        mut self,
        vocabulary: impl Into<String>,
        code_column: Option<String>,
    ) -> Self {
        self.vocabulary = Some(vocabulary.into());
        self.code_column = code_column;
        self
    }
}

/// Complete mapping configuration for one source file and one domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    pub domain_code: String,
    pub study_id: String,
    pub mappings: Vec<MappingSuggestion>,
    pub unmapped_columns: Vec<String>,
}

impl MappingConfig {
    pub fn new(domain_code: impl Into<String>, study_id: impl Into<String>) -> Self {
        Self {
            domain_code: domain_code.into().to_uppercase(),
            study_id: study_id.into(),
            mappings: Vec::new(),
            unmapped_columns: Vec::new(),
        }
    }

    pub fn with_mapping(mut self, mapping: MappingSuggestion) -> Self {
        self.mappings.push(mapping);
        self
    }

    pub fn set_study_id(&mut self, study_id: impl Into<String>) {
        self.study_id = study_id.into();
    }

    pub fn mapping_for(&self, target: &str) -> Option<&MappingSuggestion> {
        self.mappings
            .iter()
            .find(|mapping| mapping.target_variable.eq_ignore_ascii_case(target))
    }

    /// Source columns consumed by the mappings, code columns included.
    pub fn used_source_columns(&self) -> BTreeSet<String> {
        let mut used = BTreeSet::new();
        for mapping in &self.mappings {
            used.insert(mapping.source_column.clone());
            if let Some(code_column) = &mapping.code_column {
                used.insert(code_column.clone());
            }
        }
        used
    }
}
