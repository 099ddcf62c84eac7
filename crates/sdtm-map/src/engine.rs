//! Mapping engine implementation.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use sdtm_model::{
    ColumnHint, Domain, MappingConfig, MappingSuggestion, MatchKind, StudyMetadata,
    TerminologyRegistry,
};

use crate::aliases::{generic_match, suffix_matches, variable_synonyms};
use crate::score::token_set_ratio;
use crate::utils::normalize_header;

/// Confidence level categories for mapping quality assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::High => "high confidence - likely correct",
            Self::Medium => "medium confidence - should review",
            Self::Low => "low confidence - needs verification",
        }
    }
}

/// Boundaries between confidence levels. Scores below `low` have no level.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceThresholds {
    pub high: f32,
    pub medium: f32,
    pub low: f32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.95,
            medium: 0.80,
            low: 0.50,
        }
    }
}

impl ConfidenceThresholds {
    #[must_use]
    pub fn categorize(&self, confidence: f32) -> Option<ConfidenceLevel> {
        if confidence >= self.high {
            Some(ConfidenceLevel::High)
        } else if confidence >= self.medium {
            Some(ConfidenceLevel::Medium)
        } else if confidence >= self.low {
            Some(ConfidenceLevel::Low)
        } else {
            None
        }
    }
}

/// A source column whose best candidate scored below the confidence floor.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbiguousColumn {
    pub source_column: String,
    pub best_target: Option<String>,
    pub best_score: f32,
}

/// Result of a mapping operation.
#[derive(Debug, Clone)]
pub struct MappingResult {
    /// Accepted mappings, in source column order.
    pub mappings: Vec<MappingSuggestion>,
    /// Columns left without a mapping.
    pub unmapped_columns: Vec<String>,
    /// Unmapped columns whose best score fell below the floor.
    pub ambiguous: Vec<AmbiguousColumn>,
}

impl MappingResult {
    #[must_use]
    pub fn count_by_level(&self, thresholds: &ConfidenceThresholds) -> BTreeMap<ConfidenceLevel, usize> {
        let mut counts = BTreeMap::new();
        for mapping in &self.mappings {
            if let Some(level) = thresholds.categorize(mapping.confidence) {
                *counts.entry(level).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Mappings at or above `min_level`.
    #[must_use]
    pub fn filter_by_level(
        &self,
        min_level: ConfidenceLevel,
        thresholds: &ConfidenceThresholds,
    ) -> Vec<&MappingSuggestion> {
        self.mappings
            .iter()
            .filter(|m| {
                thresholds
                    .categorize(m.confidence)
                    .is_some_and(|level| level >= min_level)
            })
            .collect()
    }

    #[must_use]
    pub fn min_confidence(&self) -> Option<f32> {
        self.mappings
            .iter()
            .map(|m| m.confidence)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
    }

    #[must_use]
    pub fn mean_confidence(&self) -> Option<f32> {
        if self.mappings.is_empty() {
            return None;
        }
        let sum: f32 = self.mappings.iter().map(|m| m.confidence).sum();
        Some(sum / self.mappings.len() as f32)
    }

    #[must_use]
    pub fn count_by_kind(&self) -> BTreeMap<MatchKind, usize> {
        let mut counts = BTreeMap::new();
        for mapping in &self.mappings {
            *counts.entry(mapping.kind).or_insert(0) += 1;
        }
        counts
    }
}

/// Engine for mapping source columns to SDTM domain variables.
///
/// Candidates come from, strongest first: study metadata declarations, exact
/// variable names, category-specific synonyms, shared identifier/timing
/// aliases and token-set similarity against names, labels and synonyms.
/// Assignment is one-to-one on both sides.
///
/// # Example
///
/// ```ignore
/// let engine = MappingEngine::new(domain, 0.5, BTreeMap::new()).with_terminology(&ct);
/// let result = engine.suggest(&["Subject Id".to_string(), "Severity".to_string()]);
/// let config = engine.to_config("STUDY01", result);
/// ```
pub struct MappingEngine<'a> {
    domain: Domain,
    min_confidence: f32,
    column_hints: BTreeMap<String, ColumnHint>,
    terminology: Option<&'a TerminologyRegistry>,
    study_metadata: Option<&'a StudyMetadata>,
}

#[derive(Debug, Clone)]
struct Candidate {
    column_idx: usize,
    variable_idx: usize,
    confidence: f32,
    kind: MatchKind,
}

impl<'a> MappingEngine<'a> {
    /// Creates a new mapping engine for a specific domain.
    ///
    /// `min_confidence` is the floor (0.0-1.0) a candidate must reach to be accepted.
    pub fn new(
        domain: Domain,
        min_confidence: f32,
        column_hints: BTreeMap<String, ColumnHint>,
    ) -> Self {
        Self {
            domain,
            min_confidence,
            column_hints,
            terminology: None,
            study_metadata: None,
        }
    }

    /// Resolve codelist names for vocabulary output.
    pub fn with_terminology(mut self, terminology: &'a TerminologyRegistry) -> Self {
        self.terminology = Some(terminology);
        self
    }

    /// Study declarations override inferred mappings and bind study codelists.
    pub fn with_study_metadata(mut self, metadata: &'a StudyMetadata) -> Self {
        self.study_metadata = Some(metadata);
        self
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Suggests mappings for a list of source column names.
    pub fn suggest(&self, columns: &[String]) -> MappingResult {
        let mut candidates = Vec::new();
        for (column_idx, column) in columns.iter().enumerate() {
            // Code siblings (`SEX_CD` next to `SEX`) only take explicit matches.
            let allow_fuzzy = !is_code_sibling(column, columns);
            self.collect_candidates(column_idx, column, allow_fuzzy, &mut candidates);
        }

        let mut best_by_column: BTreeMap<usize, &Candidate> = BTreeMap::new();
        for candidate in &candidates {
            let entry = best_by_column.entry(candidate.column_idx).or_insert(candidate);
            if candidate_order(candidate, entry) == Ordering::Less {
                *entry = candidate;
            }
        }

        let mut ordered: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.confidence >= self.min_confidence)
            .collect();
        ordered.sort_by(|a, b| candidate_order(a, b));

        let mut assigned_columns: BTreeMap<usize, &Candidate> = BTreeMap::new();
        let mut assigned_variables = BTreeSet::new();
        for candidate in ordered {
            if assigned_columns.contains_key(&candidate.column_idx)
                || assigned_variables.contains(&candidate.variable_idx)
            {
                continue;
            }
            assigned_variables.insert(candidate.variable_idx);
            assigned_columns.insert(candidate.column_idx, candidate);
        }

        let used: BTreeSet<&str> = assigned_columns
            .keys()
            .map(|idx| columns[*idx].as_str())
            .collect();
        let mut mappings = Vec::new();
        let mut unmapped = Vec::new();
        let mut ambiguous = Vec::new();
        for (column_idx, column) in columns.iter().enumerate() {
            if let Some(candidate) = assigned_columns.get(&column_idx) {
                mappings.push(self.build_suggestion(column, candidate, columns, &used));
            }
        }
        let code_columns: BTreeSet<&str> = mappings
            .iter()
            .filter_map(|m: &MappingSuggestion| m.code_column.as_deref())
            .collect();
        for (column_idx, column) in columns.iter().enumerate() {
            if assigned_columns.contains_key(&column_idx) || code_columns.contains(column.as_str()) {
                continue;
            }
            unmapped.push(column.clone());
            let best = best_by_column.get(&column_idx);
            let best_score = best.map(|c| c.confidence).unwrap_or(0.0);
            if best_score < self.min_confidence {
                ambiguous.push(AmbiguousColumn {
                    source_column: column.clone(),
                    best_target: best.map(|c| self.domain.variables[c.variable_idx].name.clone()),
                    best_score,
                });
            }
        }

        debug!(
            domain = self.domain.code.as_str(),
            mapped = mappings.len(),
            unmapped = unmapped.len(),
            ambiguous = ambiguous.len(),
            "column mapping complete"
        );
        MappingResult {
            mappings,
            unmapped_columns: unmapped,
            ambiguous,
        }
    }

    /// Converts a mapping result into a [`MappingConfig`].
    pub fn to_config(&self, study_id: &str, result: MappingResult) -> MappingConfig {
        MappingConfig {
            domain_code: self.domain.code.clone(),
            study_id: study_id.to_string(),
            mappings: result.mappings,
            unmapped_columns: result.unmapped_columns,
        }
    }

    fn collect_candidates(
        &self,
        column_idx: usize,
        column: &str,
        allow_fuzzy: bool,
        out: &mut Vec<Candidate>,
    ) {
        let mut push = |variable_name: &str, confidence: f32, kind: MatchKind| {
            if let Some(variable_idx) = self.variable_index(variable_name) {
                out.push(Candidate {
                    column_idx,
                    variable_idx,
                    confidence,
                    kind,
                });
            }
        };

        if let Some(target) = self
            .study_metadata
            .and_then(|meta| meta.item(column))
            .and_then(|item| item.target_variable.as_deref())
        {
            push(target, 1.0, MatchKind::Declared);
        }

        let normalized = normalize_header(column);
        if normalized.is_empty() {
            return;
        }
        if self.variable_index(&normalized).is_some() {
            push(&normalized, 1.0, MatchKind::Exact);
        }
        for hit in suffix_matches(&self.domain, &normalized) {
            push(&hit.variable, 1.0, hit.kind);
        }
        if let Some(hit) = generic_match(&self.domain, &normalized) {
            push(&hit.variable, 1.0, hit.kind);
        }
        if !allow_fuzzy {
            return;
        }

        let label = self
            .column_hints
            .get(column)
            .and_then(|hint| hint.label.as_deref())
            .or_else(|| {
                self.study_metadata
                    .and_then(|meta| meta.item(column))
                    .map(|item| item.label.as_str())
            })
            .filter(|label| !label.trim().is_empty());
        for variable in &self.domain.variables {
            let score = self.fuzzy_score(column, label, &variable.name, variable.label.as_deref());
            if score > 0.0 {
                push(&variable.name, score as f32, MatchKind::Fuzzy);
            }
        }
    }

    fn fuzzy_score(
        &self,
        column: &str,
        column_label: Option<&str>,
        variable_name: &str,
        variable_label: Option<&str>,
    ) -> f64 {
        let mut targets: Vec<&str> = vec![variable_name];
        targets.extend(variable_label);
        let synonyms = variable_synonyms(&self.domain, variable_name);
        targets.extend(synonyms.iter().copied());

        let mut sources = vec![column];
        sources.extend(column_label);

        let mut best = 0.0_f64;
        for source in &sources {
            for target in &targets {
                best = best.max(token_set_ratio(source, target));
            }
        }
        best
    }

    fn variable_index(&self, name: &str) -> Option<usize> {
        self.domain
            .variables
            .iter()
            .position(|variable| variable.name.eq_ignore_ascii_case(name))
    }

    fn build_suggestion(
        &self,
        column: &str,
        candidate: &Candidate,
        columns: &[String],
        used: &BTreeSet<&str>,
    ) -> MappingSuggestion {
        let variable = &self.domain.variables[candidate.variable_idx];
        let mut suggestion = MappingSuggestion {
            source_column: column.to_string(),
            target_variable: variable.name.clone(),
            confidence: candidate.confidence,
            transformation: None,
            kind: candidate.kind,
            vocabulary: None,
            code_column: None,
        };

        let sibling = code_sibling(column, columns, used);
        if let Some((format, code_column)) = self.study_binding(column, sibling) {
            suggestion.vocabulary = Some(format);
            suggestion.code_column = Some(code_column);
            return suggestion;
        }

        if let Some(code) = variable.codelist_codes().into_iter().next() {
            let vocabulary = self
                .terminology
                .and_then(|ct| ct.lookup(&code))
                .map(|codelist| codelist.name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or(code);
            suggestion.vocabulary = Some(vocabulary);
            suggestion.code_column = sibling.map(str::to_string);
        }
        suggestion
    }

    /// Study codelist bound to the column or its code sibling.
    fn study_binding(&self, column: &str, sibling: Option<&str>) -> Option<(String, String)> {
        let metadata = self.study_metadata?;
        let bound = |name: &str| {
            metadata
                .item(name)
                .and_then(|item| item.format_name.as_deref())
                .filter(|format| metadata.codelist(format).is_some())
                .map(str::to_string)
        };
        if let Some(format) = bound(column) {
            let code_column = sibling.unwrap_or(column).to_string();
            return Some((format, code_column));
        }
        let sibling = sibling?;
        bound(sibling).map(|format| (format, sibling.to_string()))
    }
}

/// Score desc, then match kind, then column position, then variable order.
fn candidate_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then(a.kind.cmp(&b.kind))
        .then(a.column_idx.cmp(&b.column_idx))
        .then(a.variable_idx.cmp(&b.variable_idx))
}

const CODE_SUFFIXES: [&str; 4] = ["CD", "_CD", "CODE", "_CODE"];

/// True when `column` is the code sibling of another column in the table.
fn is_code_sibling(column: &str, columns: &[String]) -> bool {
    let upper = column.trim().to_uppercase();
    CODE_SUFFIXES.iter().any(|suffix| {
        upper
            .strip_suffix(suffix)
            .filter(|base| !base.is_empty())
            .is_some_and(|base| columns.iter().any(|c| c.trim().eq_ignore_ascii_case(base)))
    })
}

/// Sibling column holding raw codes for `column` (`SEX` -> `SEX_CD`), unless mapped itself.
fn code_sibling<'c>(column: &str, columns: &'c [String], used: &BTreeSet<&str>) -> Option<&'c str> {
    let base = column.trim();
    CODE_SUFFIXES.iter().find_map(|suffix| {
        let name = format!("{base}{suffix}");
        columns
            .iter()
            .find(|c| c.trim().eq_ignore_ascii_case(&name) && !used.contains(c.as_str()))
            .map(String::as_str)
    })
}
