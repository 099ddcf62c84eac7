//! Controlled Terminology (CT) model.
//!
//! CT package files contain two kinds of rows:
//!
//! 1. **Codelist definition rows**: `Code` is the codelist NCI code (e.g. `C66731`),
//!    `Codelist Code` is blank and `Codelist Extensible (Yes/No)` carries the flag.
//! 2. **Term rows**: `Codelist Code` names the parent codelist and
//!    `CDISC Submission Value` is the value permitted in datasets;
//!    `CDISC Synonym(s)` lists aliases that normalize to it.
//!
//! ```text
//! Codelist row:  Code=C66731, Codelist Code="", Extensible=No, Name=Sex
//! Term rows:     Codelist Code=C66731, submission values: F, M, INTERSEX, U
//! ```
//!
//! Several packages may define the same codelist. [`TerminologyRegistry`] merges
//! them: terms and synonyms are unioned, the first-loaded name, extensibility
//! flag and term definitions are kept.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A single term within a codelist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// NCI concept code for this term (e.g., "C20197" for Male).
    pub code: String,

    /// The permissible value in datasets (e.g., "M" for Male).
    pub submission_value: String,

    /// Alternative spellings that normalize to `submission_value`.
    pub synonyms: Vec<String>,

    pub definition: Option<String>,

    pub preferred_term: Option<String>,
}

/// A codelist containing multiple terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Codelist {
    /// NCI code for this codelist (e.g., "C66731" for Sex).
    pub code: String,

    /// Human-readable name (e.g., "Sex", "No Yes Response").
    pub name: String,

    /// Whether sponsors can add values not in this codelist.
    pub extensible: bool,

    /// Terms keyed by uppercase submission value.
    pub terms: BTreeMap<String, Term>,

    /// Uppercase alias -> uppercase submission value.
    synonyms: BTreeMap<String, String>,
}

impl Codelist {
    pub fn new(code: String, name: String, extensible: bool) -> Self {
        Self {
            code,
            name,
            extensible,
            terms: BTreeMap::new(),
            synonyms: BTreeMap::new(),
        }
    }

    /// Add a term. A term already present keeps its code and definition and
    /// gains any new synonyms.
    pub fn add_term(&mut self, term: Term) {
        let key = term.submission_value.trim().to_uppercase();
        if key.is_empty() {
            return;
        }

        for synonym in &term.synonyms {
            let syn_key = synonym.trim().to_uppercase();
            if syn_key.is_empty() || syn_key == key {
                continue;
            }
            self.synonyms.entry(syn_key).or_insert_with(|| key.clone());
        }

        match self.terms.get_mut(&key) {
            Some(existing) => {
                for synonym in term.synonyms {
                    if !existing
                        .synonyms
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(&synonym))
                    {
                        existing.synonyms.push(synonym);
                    }
                }
                if existing.code.is_empty() {
                    existing.code = term.code;
                }
                if existing.definition.is_none() {
                    existing.definition = term.definition;
                }
                if existing.preferred_term.is_none() {
                    existing.preferred_term = term.preferred_term;
                }
            }
            None => {
                self.terms.insert(key, term);
            }
        }
    }

    /// Merge another definition of the same codelist into this one.
    pub fn merge(&mut self, other: Codelist) {
        if self.name.is_empty() {
            self.name = other.name;
        }
        for term in other.terms.into_values() {
            self.add_term(term);
        }
    }

    pub fn submission_values(&self) -> Vec<&str> {
        self.terms
            .values()
            .map(|t| t.submission_value.as_str())
            .collect()
    }

    /// True when `value` is a canonical submission value (case-insensitive).
    pub fn contains(&self, value: &str) -> bool {
        self.terms.contains_key(&value.trim().to_uppercase())
    }

    /// Check if a value is valid for this codelist (submission value or synonym).
    pub fn is_valid(&self, value: &str) -> bool {
        self.lookup(value).is_some()
    }

    /// Find the term a raw value refers to.
    ///
    /// Tries the submission value, then synonyms, then a comparison that ignores
    /// case and non-alphanumeric characters.
    pub fn lookup(&self, raw: &str) -> Option<&Term> {
        let key = raw.trim().to_uppercase();
        if key.is_empty() {
            return None;
        }
        if let Some(term) = self.terms.get(&key) {
            return Some(term);
        }
        if let Some(canonical_key) = self.synonyms.get(&key)
            && let Some(term) = self.terms.get(canonical_key)
        {
            return Some(term);
        }
        let compact = compact_key(&key);
        if compact.is_empty() {
            return None;
        }
        if let Some(term) = self
            .terms
            .iter()
            .find(|(term_key, _)| compact_key(term_key) == compact)
            .map(|(_, term)| term)
        {
            return Some(term);
        }
        self.synonyms
            .iter()
            .find(|(syn_key, _)| compact_key(syn_key) == compact)
            .and_then(|(_, canonical_key)| self.terms.get(canonical_key))
    }

    /// Normalize a value to its canonical submission value.
    ///
    /// Unmatched values come back trimmed but otherwise unchanged.
    pub fn normalize(&self, value: &str) -> String {
        match self.lookup(value) {
            Some(term) => term.submission_value.clone(),
            None => value.trim().to_string(),
        }
    }

    /// Normalized values outside the canonical set; empty for extensible codelists.
    pub fn invalid_values<'a, I>(&self, values: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.extensible {
            return BTreeSet::new();
        }
        values
            .into_iter()
            .map(|value| self.normalize(value))
            .filter(|value| !value.is_empty() && !self.contains(value))
            .collect()
    }

    /// NCI concept code for a value.
    pub fn nci_code(&self, value: &str) -> Option<&str> {
        self.lookup(value)
            .map(|term| term.code.as_str())
            .filter(|code| !code.is_empty())
    }

    /// Term carrying the given NCI concept code.
    pub fn term_for_code(&self, nci_code: &str) -> Option<&Term> {
        let code = nci_code.trim();
        self.terms
            .values()
            .find(|term| term.code.eq_ignore_ascii_case(code))
    }
}

fn compact_key(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_uppercase()
}

/// One CT package file (e.g., "SDTM CT 2024-03-29").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminologyCatalog {
    /// Display label (e.g., "SDTM CT").
    pub label: String,

    /// Release version/date (e.g., "2024-03-29").
    pub version: Option<String>,

    /// Publishing set (e.g., "SDTM", "SEND", "ADaM").
    pub publishing_set: Option<String>,

    /// Source file name.
    pub source: Option<String>,

    /// SHA-256 of the source file.
    #[serde(default)]
    pub sha256: Option<String>,

    /// Codelists by NCI code (uppercase).
    pub codelists: BTreeMap<String, Codelist>,
}

impl TerminologyCatalog {
    pub fn new(label: String, version: Option<String>, publishing_set: Option<String>) -> Self {
        Self {
            label,
            version,
            publishing_set,
            source: None,
            sha256: None,
            codelists: BTreeMap::new(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&Codelist> {
        self.codelists.get(&code.to_uppercase())
    }

    pub fn add_codelist(&mut self, codelist: Codelist) {
        self.codelists
            .insert(codelist.code.to_uppercase(), codelist);
    }
}

/// Provenance of a package merged into a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub label: String,
    pub version: Option<String>,
    pub publishing_set: Option<String>,
    pub source: Option<String>,
    pub sha256: Option<String>,
    pub codelist_count: usize,
}

/// Merged view over every loaded CT package.
///
/// Built once and shared read-only across builds; [`TerminologyRegistry::clear`]
/// resets it for test isolation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerminologyRegistry {
    /// Codelists by uppercase NCI code.
    codelists: BTreeMap<String, Codelist>,
    /// Uppercase codelist name -> uppercase NCI code.
    names: BTreeMap<String, String>,
    packages: Vec<PackageInfo>,
}

impl TerminologyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a package into the registry. Earlier packages win on conflicts.
    pub fn add_package(&mut self, catalog: TerminologyCatalog) {
        self.packages.push(PackageInfo {
            label: catalog.label,
            version: catalog.version,
            publishing_set: catalog.publishing_set,
            source: catalog.source,
            sha256: catalog.sha256,
            codelist_count: catalog.codelists.len(),
        });
        for codelist in catalog.codelists.into_values() {
            self.add_codelist(codelist);
        }
    }

    pub fn add_codelist(&mut self, codelist: Codelist) {
        let key = codelist.code.to_uppercase();
        let name_key = codelist.name.trim().to_uppercase();
        if !name_key.is_empty() {
            self.names.entry(name_key).or_insert_with(|| key.clone());
        }
        match self.codelists.get_mut(&key) {
            Some(existing) => existing.merge(codelist),
            None => {
                self.codelists.insert(key, codelist);
            }
        }
    }

    /// Resolve a codelist by NCI code or by name (case-insensitive).
    pub fn lookup(&self, code_or_name: &str) -> Option<&Codelist> {
        let key = code_or_name.trim().to_uppercase();
        if let Some(codelist) = self.codelists.get(&key) {
            return Some(codelist);
        }
        self.names
            .get(&key)
            .and_then(|code| self.codelists.get(code))
    }

    /// Normalize `raw` against a vocabulary. `None` only when the vocabulary is unknown.
    pub fn normalize(&self, vocabulary: &str, raw: &str) -> Option<String> {
        self.lookup(vocabulary).map(|codelist| codelist.normalize(raw))
    }

    /// Values outside a non-extensible vocabulary; empty for unknown or extensible ones.
    pub fn invalid_values<'a, I>(&self, vocabulary: &str, values: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.lookup(vocabulary)
            .map(|codelist| codelist.invalid_values(values))
            .unwrap_or_default()
    }

    pub fn nci_code(&self, vocabulary: &str, value: &str) -> Option<&str> {
        self.lookup(vocabulary)
            .and_then(|codelist| codelist.nci_code(value))
    }

    pub fn packages(&self) -> &[PackageInfo] {
        &self.packages
    }

    pub fn codelists(&self) -> impl Iterator<Item = &Codelist> {
        self.codelists.values()
    }

    pub fn len(&self) -> usize {
        self.codelists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codelists.is_empty()
    }

    pub fn clear(&mut self) {
        self.codelists.clear();
        self.names.clear();
        self.packages.clear();
    }
}
