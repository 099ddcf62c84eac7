use std::collections::HashMap;

use anyhow::Result;
use polars::prelude::DataFrame;
use tracing::warn;

use sdtm_model::{Codelist, Domain};

use crate::datetime::end_before_start;
use crate::pipeline_context::PipelineContext;

pub(super) use crate::data_utils::{has_column, numeric_column, set_string_column, string_column};
pub(super) use crate::frame_utils::deduplicate;
pub(super) use crate::sequence::assign_sequence;

/// Domain column for `name` (`--` expands to the domain code) when present in `df`.
pub(super) fn col(domain: &Domain, df: &DataFrame, name: &str) -> Option<String> {
    domain
        .column_name(name)
        .filter(|column| has_column(df, column))
        .map(str::to_string)
}

/// Resolve `--` names, dropping those the frame does not carry.
pub(super) fn cols(domain: &Domain, df: &DataFrame, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .filter_map(|name| col(domain, df, name))
        .collect()
}

pub(super) fn map_values<const N: usize>(pairs: [(&str, &str); N]) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(N);
    for (key, value) in pairs {
        map.insert(key.to_string(), value.to_string());
    }
    map
}

pub(super) fn yn_mapping() -> HashMap<String, String> {
    map_values([
        ("Y", "Y"),
        ("YES", "Y"),
        ("TRUE", "Y"),
        ("T", "Y"),
        ("1", "Y"),
        ("N", "N"),
        ("NO", "N"),
        ("FALSE", "N"),
        ("F", "N"),
        ("0", "N"),
    ])
}

/// Upper-case a column and replace mapped values; unmapped values stay upper-cased.
pub(super) fn apply_map_upper(
    df: &mut DataFrame,
    column: &str,
    mapping: &HashMap<String, String>,
) -> Result<()> {
    let values = string_column(df, column)?
        .into_iter()
        .map(|value| {
            let upper = value.to_uppercase();
            mapping.get(&upper).cloned().unwrap_or(upper)
        })
        .collect();
    set_string_column(df, column, values)
}

/// Fill blanks in `target` from `source`. Returns the number of filled rows.
pub(super) fn backfill(domain: &Domain, df: &mut DataFrame, source: &str, target: &str) -> Result<usize> {
    let (Some(source), Some(target)) = (col(domain, df, source), col(domain, df, target)) else {
        return Ok(0);
    };
    let from = string_column(df, &source)?;
    let mut values = string_column(df, &target)?;
    let mut filled = 0;
    for (value, fallback) in values.iter_mut().zip(&from) {
        if value.is_empty() && !fallback.is_empty() {
            *value = fallback.clone();
            filled += 1;
        }
    }
    if filled > 0 {
        set_string_column(df, &target, values)?;
    }
    Ok(filled)
}

/// True when a value is a canonical value of any of the codelists.
pub(super) fn in_vocabulary(codelists: &[&Codelist], value: &str) -> bool {
    codelists.iter().any(|codelist| codelist.contains(value))
}

/// Substitute `default` for values outside the variable's vocabulary.
///
/// Blank values are substituted only when `fill_blank` is set. Variables without
/// a resolvable vocabulary are left alone. Returns the number of rewritten rows.
pub(super) fn default_outside_vocabulary(
    domain: &Domain,
    df: &mut DataFrame,
    context: &PipelineContext,
    variable: &str,
    default: &str,
    fill_blank: bool,
) -> Result<usize> {
    let Some(column) = col(domain, df, variable) else {
        return Ok(0);
    };
    let codelists = context.resolve_ct(domain, &column);
    if codelists.is_empty() {
        return Ok(0);
    }
    let mut values = string_column(df, &column)?;
    let mut rewritten = 0;
    for value in values.iter_mut() {
        let outside = if value.is_empty() {
            fill_blank
        } else {
            !in_vocabulary(&codelists, value)
        };
        if outside {
            *value = default.to_string();
            rewritten += 1;
        }
    }
    if rewritten > 0 {
        if context.options.warn_on_rewrite {
            warn!(
                domain = domain.code.as_str(),
                variable = column.as_str(),
                rewritten,
                default,
                "values outside vocabulary replaced with default"
            );
        }
        set_string_column(df, &column, values)?;
    }
    Ok(rewritten)
}

/// Warn about rows whose end date precedes the start date. Values are not rewritten.
pub(super) fn warn_date_pair_order(domain: &Domain, df: &DataFrame, start: &str, end: &str) -> Result<usize> {
    let (Some(start), Some(end)) = (col(domain, df, start), col(domain, df, end)) else {
        return Ok(0);
    };
    let starts = string_column(df, &start)?;
    let ends = string_column(df, &end)?;
    let invalid = starts
        .iter()
        .zip(&ends)
        .filter(|(start, end)| end_before_start(start, end))
        .count();
    if invalid > 0 {
        warn!(
            domain = domain.code.as_str(),
            start = start.as_str(),
            end = end.as_str(),
            invalid,
            "end date precedes start date"
        );
    }
    Ok(invalid)
}

/// Deduplicate on `--` keys resolved against the domain.
pub(super) fn dedupe_on(domain: &Domain, df: &mut DataFrame, keys: &[&str]) -> Result<usize> {
    let keys = cols(domain, df, keys);
    let removed = deduplicate(df, &keys)?;
    if removed > 0 {
        warn!(
            domain = domain.code.as_str(),
            removed,
            keys = keys.join(","),
            "duplicate records removed"
        );
    }
    Ok(removed)
}

/// First codelist bound to a variable.
pub(super) fn first_codelist<'a>(
    domain: &Domain,
    context: &PipelineContext<'a>,
    variable: &str,
) -> Option<&'a Codelist> {
    context.resolve_ct(domain, variable).into_iter().next()
}
