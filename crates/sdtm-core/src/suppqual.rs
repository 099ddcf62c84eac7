//! Supplemental qualifier (SUPP--) extraction.
//!
//! Source columns that no mapping consumed and that have no home in the
//! domain become name/value side records attached to their owning canonical
//! record. Columns recurring across most of a study's input files are treated
//! as operational scaffolding and skipped.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use tracing::debug;

use sdtm_model::{Domain, SUPPQUAL_VARIABLES, SuppqualOptions, SuppqualRecord};

use crate::data_utils::{find_column, string_column};
use crate::frame::DomainFrame;
use crate::frame_utils::LINEAGE_COLUMN;
use crate::pipeline_context::PipelineContext;

const QNAM_MAX_LENGTH: usize = 8;

pub fn suppqual_domain_code(parent_domain: &str) -> String {
    format!("SUPP{}", parent_domain.to_uppercase())
}

/// How many of a study's input files carry each column header.
#[derive(Debug, Clone, Default)]
pub struct OperationalColumns {
    counts: BTreeMap<String, usize>,
    total_files: usize,
    threshold: usize,
}

impl OperationalColumns {
    /// Count headers across files; a header repeated within one file counts once.
    pub fn from_file_headers(files: &[Vec<String>], options: &SuppqualOptions) -> Self {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for headers in files {
            let distinct: BTreeSet<String> = headers
                .iter()
                .map(|header| header.trim().to_uppercase())
                .filter(|header| !header.is_empty())
                .collect();
            for header in distinct {
                *counts.entry(header).or_default() += 1;
            }
        }
        Self {
            counts,
            total_files: files.len(),
            threshold: options.operational_threshold(files.len()),
        }
    }

    /// Number of files carrying `column`.
    pub fn file_count(&self, column: &str) -> usize {
        self.counts
            .get(&column.trim().to_uppercase())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// True when `column` recurs in at least the threshold number of *other* files.
    pub fn is_operational(&self, column: &str) -> bool {
        let others = self.file_count(column).saturating_sub(1);
        others > 0 && others >= self.threshold
    }
}

/// Side records for one domain plus the SUPP-- table built from them.
#[derive(Debug, Clone)]
pub struct SuppqualResult {
    /// e.g. "SUPPAE".
    pub domain_code: String,
    pub records: Vec<SuppqualRecord>,
    /// Records as a table in standard SUPPQUAL variable order.
    pub data: DataFrame,
    /// Source columns turned into qualifiers.
    pub used_columns: Vec<String>,
}

/// Upper-case alphanumerics, `Q` before a leading digit, at most 8 characters.
pub fn sanitize_qnam(name: &str) -> String {
    let mut safe: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    if safe.is_empty() {
        safe = "QVAL".to_string();
    }
    if safe.starts_with(|ch: char| ch.is_ascii_digit()) {
        safe.insert(0, 'Q');
    }
    safe.chars().take(QNAM_MAX_LENGTH).collect()
}

/// Replace the tail of `base` with a counter until the name is unused.
fn unique_qnam(base: &str, taken: &BTreeSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut counter = 1usize;
    loop {
        let suffix = counter.to_string();
        let keep = QNAM_MAX_LENGTH.saturating_sub(suffix.len());
        let candidate: String = base.chars().take(keep).chain(suffix.chars()).collect();
        if !taken.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Extract supplemental qualifiers for `domain`.
///
/// Returns `None` when no column qualifies or every qualifying cell is blank.
pub fn extract_suppqual(
    domain: &Domain,
    source: &DataFrame,
    canonical: &DomainFrame,
    used_columns: &BTreeSet<String>,
    operational: Option<&OperationalColumns>,
    context: &PipelineContext,
) -> Result<Option<SuppqualResult>> {
    let options = &context.suppqual;
    let used_upper: BTreeSet<String> = used_columns
        .iter()
        .map(|column| column.trim().to_uppercase())
        .collect();
    let mut taken: BTreeSet<String> = domain
        .variables
        .iter()
        .map(|variable| variable.name.to_uppercase())
        .collect();

    let mut qualifying: Vec<(String, String)> = Vec::new();
    for name in source.get_column_names() {
        let name = name.to_string();
        let upper = name.trim().to_uppercase();
        if name == LINEAGE_COLUMN || used_upper.contains(&upper) || taken.contains(&upper) {
            continue;
        }
        if operational.is_some_and(|table| table.is_operational(&name)) {
            debug!(
                domain = domain.code.as_str(),
                column = name.as_str(),
                "operational column skipped"
            );
            continue;
        }
        let qnam = unique_qnam(&sanitize_qnam(&name), &taken);
        taken.insert(qnam.clone());
        qualifying.push((name, qnam));
    }
    if qualifying.is_empty() {
        return Ok(None);
    }

    let data = &canonical.data;
    let canonical_column = |name: &str| -> Result<Option<Vec<String>>> {
        match domain.column_name(name).and_then(|column| find_column(data, column)) {
            Some(column) => Ok(Some(string_column(data, &column)?)),
            None => Ok(None),
        }
    };
    let studyids = canonical_column("STUDYID")?;
    let usubjids = canonical_column("USUBJID")?.unwrap_or_else(|| vec![String::new(); data.height()]);
    let (idvar, idvarvals) = match domain
        .infer_seq_column()
        .and_then(|seq| find_column(data, seq))
    {
        Some(seq) => {
            let values = string_column(data, &seq)?;
            (seq, Some(values))
        }
        None => (String::new(), None),
    };

    // Canonical row owning each source row; the first wins when rows were merged.
    let mut owner: BTreeMap<usize, usize> = BTreeMap::new();
    for (idx, source_row) in canonical.source_rows.iter().enumerate() {
        if let Some(source_row) = source_row {
            owner.entry(*source_row).or_insert(idx);
        }
    }

    let mut records = Vec::new();
    let mut seen: BTreeSet<(String, String, String, String)> = BTreeSet::new();
    let mut used = Vec::new();
    let mut orphaned = 0usize;
    for (column, qnam) in &qualifying {
        let values = string_column(source, column)?;
        let label = context
            .study_metadata
            .and_then(|metadata| metadata.item(column))
            .map(|item| item.label.trim().to_string())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| column.clone());
        let qlabel = truncate_chars(&label, options.qlabel_max_length);
        let mut produced = false;
        for (source_row, value) in values.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let Some(&row) = owner.get(&source_row) else {
                orphaned += 1;
                continue;
            };
            let idvarval = idvarvals
                .as_ref()
                .map(|values| values[row].clone())
                .unwrap_or_default();
            let key = (
                usubjids[row].clone(),
                idvar.clone(),
                idvarval.clone(),
                qnam.clone(),
            );
            if !seen.insert(key) {
                continue;
            }
            let studyid = studyids
                .as_ref()
                .map(|values| values[row].clone())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| context.study_id.clone());
            records.push(SuppqualRecord {
                studyid,
                rdomain: domain.code.clone(),
                usubjid: usubjids[row].clone(),
                idvar: idvar.clone(),
                idvarval,
                qnam: qnam.clone(),
                qlabel: qlabel.clone(),
                qval: truncate_chars(value, options.qval_max_length),
                qorig: options.qorig.clone(),
                qeval: String::new(),
            });
            produced = true;
        }
        if produced {
            used.push(column.clone());
        }
    }
    if orphaned > 0 {
        debug!(
            domain = domain.code.as_str(),
            orphaned,
            "qualifier values without an owning record skipped"
        );
    }
    if records.is_empty() {
        return Ok(None);
    }

    let data = records_frame(&records)?;
    debug!(
        domain = domain.code.as_str(),
        records = records.len(),
        columns = used.len(),
        "supplemental qualifiers extracted"
    );
    Ok(Some(SuppqualResult {
        domain_code: suppqual_domain_code(&domain.code),
        records,
        data,
        used_columns: used,
    }))
}

fn records_frame(records: &[SuppqualRecord]) -> Result<DataFrame> {
    let columns: Vec<Column> = SUPPQUAL_VARIABLES
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let values: Vec<&str> = records.iter().map(|record| record.values()[position]).collect();
            Series::new((*name).into(), values).into()
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qnam_is_sanitized_and_capped() {
        assert_eq!(sanitize_qnam("Site Notes!"), "SITENOTE");
        assert_eq!(sanitize_qnam("2nd visit"), "Q2NDVISI");
        assert_eq!(sanitize_qnam("__"), "QVAL");
    }

    #[test]
    fn colliding_qnam_gets_counter_tail() {
        let mut taken: BTreeSet<String> = ["LONGNAME".to_string()].into();
        assert_eq!(unique_qnam("LONGNAME", &taken), "LONGNAM1");
        taken.insert("LONGNAM1".to_string());
        assert_eq!(unique_qnam("LONGNAME", &taken), "LONGNAM2");
        assert_eq!(unique_qnam("SHORT", &taken), "SHORT");
    }

    #[test]
    fn operational_threshold_counts_other_files() {
        let options = SuppqualOptions::default();
        let files: Vec<Vec<String>> = (0..5)
            .map(|idx| {
                let mut headers = vec!["SUBJECT".to_string()];
                if idx < 4 {
                    headers.push("SITE".to_string());
                }
                if idx == 0 {
                    headers.push("NOTES".to_string());
                }
                headers
            })
            .collect();
        let table = OperationalColumns::from_file_headers(&files, &options);
        assert!(table.is_operational("site"));
        assert!(!table.is_operational("NOTES"));
        assert!(!table.is_operational("MISSING"));
        assert_eq!(table.total_files(), 5);
    }
}
