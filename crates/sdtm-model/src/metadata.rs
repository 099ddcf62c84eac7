//! Study-level override metadata.
//!
//! Column definitions and study-scoped codelists supplied alongside the source
//! data. Explicit declarations here outrank anything the mapping engine infers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Definition of a source column from study metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceColumn {
    /// Column identifier/name.
    pub id: String,
    /// Human-readable label.
    pub label: String,
    /// Declared target variable, when the study pins the mapping.
    #[serde(default)]
    pub target_variable: Option<String>,
    /// Data type (e.g., "text", "integer").
    pub data_type: Option<String>,
    pub mandatory: bool,
    /// Name of the study codelist (format) bound to this column.
    pub format_name: Option<String>,
    pub content_length: Option<usize>,
}

impl SourceColumn {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            target_variable: None,
            data_type: None,
            mandatory: false,
            format_name: None,
            content_length: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_variable = Some(target.into());
        self
    }

    pub fn with_format(mut self, format_name: impl Into<String>) -> Self {
        self.format_name = Some(format_name.into());
        self
    }
}

/// A study-specific codelist (format) mapping coded values to decoded text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyCodelist {
    pub format_name: String,
    /// Decoded text by code as declared.
    values: BTreeMap<String, String>,
    /// Decoded text by [`code_key`].
    keyed: BTreeMap<String, String>,
}

impl StudyCodelist {
    pub fn new(format_name: impl Into<String>) -> Self {
        Self {
            format_name: format_name.into(),
            values: BTreeMap::new(),
            keyed: BTreeMap::new(),
        }
    }

    /// Blank codes or texts are ignored.
    pub fn insert_value(&mut self, code_value: &str, code_text: &str) {
        let (code, text) = (code_value.trim(), code_text.trim());
        if code.is_empty() || text.is_empty() {
            return;
        }
        self.keyed.insert(code_key(code), text.to_string());
        self.values.insert(code.to_string(), text.to_string());
    }

    pub fn with_value(mut self, code_value: &str, code_text: &str) -> Self {
        self.insert_value(code_value, code_text);
        self
    }

    /// Decode a raw code: exact match first, then ignoring case, then by numeric
    /// value (`"1.0"` finds `"1"`).
    pub fn lookup_text(&self, raw: &str) -> Option<String> {
        let code = raw.trim();
        if code.is_empty() {
            return None;
        }
        self.values
            .get(code)
            .or_else(|| self.keyed.get(&code_key(code)))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Collection of study metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyMetadata {
    /// Source column definitions keyed by column ID.
    pub items: BTreeMap<String, SourceColumn>,
    /// Study-specific codelists keyed by format name.
    pub codelists: BTreeMap<String, StudyCodelist>,
}

impl StudyMetadata {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.codelists.is_empty()
    }

    pub fn add_item(&mut self, item: SourceColumn) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn add_codelist(&mut self, codelist: StudyCodelist) {
        self.codelists
            .insert(codelist.format_name.clone(), codelist);
    }

    /// Column definition by name (case-insensitive).
    pub fn item(&self, column: &str) -> Option<&SourceColumn> {
        let column = column.trim();
        self.items.get(column).or_else(|| {
            self.items
                .values()
                .find(|item| item.id.eq_ignore_ascii_case(column))
        })
    }

    /// Study codelist by format name (case-insensitive).
    pub fn codelist(&self, format_name: &str) -> Option<&StudyCodelist> {
        let name = format_name.trim();
        self.codelists.get(name).or_else(|| {
            self.codelists
                .values()
                .find(|codelist| codelist.format_name.eq_ignore_ascii_case(name))
        })
    }
}

/// Numeric codes compare by value, everything else upper-cased.
fn code_key(code: &str) -> String {
    match code.parse::<f64>() {
        Ok(number) if number.is_finite() => number.to_string(),
        _ => code.to_uppercase(),
    }
}
