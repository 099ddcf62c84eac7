//! Per-subject sequence numbering.
//!
//! Sequence values from the source are never trusted: processors sort
//! explicitly and renumber, and the pipeline regenerates any sequence that is
//! not a dense `1..N` per subject after the processor has run.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use polars::prelude::DataFrame;
use sdtm_model::Domain;

use crate::data_utils::{has_column, numeric_column, set_f64_column, string_column};
use crate::frame_utils::sort_rows;

/// Sequence and subject column names for a domain, when both are present in `df`.
pub fn sequence_columns(domain: &Domain, df: &DataFrame) -> Option<(String, String)> {
    let seq = domain.infer_seq_column()?;
    let usubjid = domain.column_name("USUBJID")?;
    if has_column(df, seq) && has_column(df, usubjid) {
        Some((usubjid.to_string(), seq.to_string()))
    } else {
        None
    }
}

/// Stable sort by subject then `order_keys`, and number rows 1..N per subject.
///
/// Order keys use `--` for the domain prefix; keys absent from the frame are skipped.
pub fn assign_sequence(domain: &Domain, df: &mut DataFrame, order_keys: &[&str]) -> Result<()> {
    let Some((usubjid, seq)) = sequence_columns(domain, df) else {
        return Ok(());
    };
    let mut keys = vec![usubjid.clone()];
    keys.extend(
        order_keys
            .iter()
            .filter_map(|key| domain.column_name(key))
            .map(str::to_string),
    );
    sort_rows(df, &keys)?;
    number_in_row_order(df, &usubjid, &seq)
}

/// Position-preserving cumulative count per subject.
pub fn number_in_row_order(df: &mut DataFrame, usubjid: &str, seq: &str) -> Result<()> {
    let subjects = string_column(df, usubjid)?;
    let mut counters: BTreeMap<&str, f64> = BTreeMap::new();
    let values: Vec<Option<f64>> = subjects
        .iter()
        .map(|subject| {
            let counter = counters.entry(subject.as_str()).or_insert(0.0);
            *counter += 1.0;
            Some(*counter)
        })
        .collect();
    set_f64_column(df, seq, values)
}

/// Number of rows whose (subject, sequence) pair repeats an earlier row.
pub fn count_collisions(df: &DataFrame, usubjid: &str, seq: &str) -> Result<usize> {
    let subjects = string_column(df, usubjid)?;
    let values = numeric_column(df, seq)?;
    let mut seen = BTreeSet::new();
    let mut collisions = 0;
    for (subject, value) in subjects.iter().zip(values) {
        let Some(value) = value else {
            continue;
        };
        if !seen.insert((subject.as_str(), value.to_bits())) {
            collisions += 1;
        }
    }
    Ok(collisions)
}

/// True when every subject's sequence values are exactly `1..=N`.
pub fn is_dense(df: &DataFrame, usubjid: &str, seq: &str) -> Result<bool> {
    let subjects = string_column(df, usubjid)?;
    let values = numeric_column(df, seq)?;
    let mut by_subject: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (subject, value) in subjects.iter().zip(values) {
        let Some(value) = value else {
            return Ok(false);
        };
        by_subject.entry(subject.as_str()).or_default().push(value);
    }
    Ok(by_subject.into_values().all(|mut values| {
        values.sort_by(f64::total_cmp);
        values
            .iter()
            .enumerate()
            .all(|(idx, value)| *value == (idx + 1) as f64)
    }))
}

/// Renumber in current row order unless already dense. Returns whether values changed.
pub fn ensure_dense_sequence(domain: &Domain, df: &mut DataFrame) -> Result<bool> {
    let Some((usubjid, seq)) = sequence_columns(domain, df) else {
        return Ok(false);
    };
    if is_dense(df, &usubjid, &seq)? {
        return Ok(false);
    }
    number_in_row_order(df, &usubjid, &seq)?;
    Ok(true)
}
