//! The generic canonicalization rules applied by the pipeline steps.
//!
//! Each function works on the canonical frame in place. Character variables
//! are String columns with `""` for missing; numeric variables are Float64
//! columns with null for missing.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use tracing::{debug, warn};

use sdtm_model::{
    BuildIssue, Codelist, Domain, IssueKind, IssueLog, MappingConfig, MappingSuggestion,
    ProcessingOptions, Variable, VariableType,
};

use crate::data_utils::{
    find_column, has_column, map_string_column, numeric_column, parse_f64, set_f64_column,
    set_string_column, string_column,
};
use crate::datetime::{calculate_study_day, normalize_datetime};
use crate::duration::normalize_duration;
use crate::error::{BuildError, MissingValues};
use crate::frame_utils::LINEAGE_COLUMN;
use crate::pipeline_context::PipelineContext;

/// An empty canonical frame: every variable, typed, `height` rows, plus lineage.
pub fn allocate_frame(domain: &Domain, height: usize) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(domain.variables.len() + 1);
    let mut seen = BTreeSet::new();
    for variable in &domain.variables {
        if !seen.insert(variable.name.to_uppercase()) {
            continue;
        }
        let series = match variable.data_type {
            VariableType::Char => Series::new(variable.name.as_str().into(), vec![""; height]),
            VariableType::Num => {
                Series::new(variable.name.as_str().into(), vec![None::<f64>; height])
            }
        };
        columns.push(series.into());
    }
    let lineage: Vec<i64> = (0..height as i64).collect();
    columns.push(Series::new(LINEAGE_COLUMN.into(), lineage).into());
    DataFrame::new(columns).with_context(|| format!("allocate {} frame", domain.code))
}

/// Write character values, or parse them into a numeric column.
pub fn write_variable(df: &mut DataFrame, variable: &Variable, values: Vec<String>) -> Result<usize> {
    match variable.data_type {
        VariableType::Char => {
            set_string_column(df, &variable.name, values)?;
            Ok(0)
        }
        VariableType::Num => {
            let mut unparsable = 0;
            let parsed: Vec<Option<f64>> = values
                .iter()
                .map(|value| {
                    let parsed = parse_f64(value);
                    if parsed.is_none() && !value.is_empty() {
                        unparsable += 1;
                    }
                    parsed
                })
                .collect();
            set_f64_column(df, &variable.name, parsed)?;
            Ok(unparsable)
        }
    }
}

/// Copy every mapped source column into its target variable.
pub fn copy_mapped_values(
    domain: &Domain,
    df: &mut DataFrame,
    source: &DataFrame,
    config: &MappingConfig,
    context: &PipelineContext,
) -> Result<()> {
    for mapping in &config.mappings {
        let Some(variable) = domain.variable(&mapping.target_variable) else {
            warn!(
                domain = domain.code.as_str(),
                source = mapping.source_column.as_str(),
                target = mapping.target_variable.as_str(),
                "mapping target is not a domain variable; skipped"
            );
            continue;
        };
        let Some(column) = find_column(source, &mapping.source_column) else {
            return Err(BuildError::MissingSourceColumn {
                domain: domain.code.clone(),
                column: mapping.source_column.clone(),
                variable: variable.name.clone(),
            }
            .into());
        };
        let mut values = string_column(source, &column)?;
        decode_code_column(domain, source, mapping, context, &mut values)?;
        apply_transformation(mapping.transformation.as_deref(), &mut values);
        let unparsable = write_variable(df, variable, values)
            .with_context(|| format!("copy {} into {}", column, variable.name))?;
        if unparsable > 0 {
            warn!(
                domain = domain.code.as_str(),
                variable = variable.name.as_str(),
                unparsable,
                "non-numeric values dropped from numeric variable"
            );
        }
    }
    Ok(())
}

fn apply_transformation(transformation: Option<&str>, values: &mut [String]) {
    let Some(transformation) = transformation else {
        return;
    };
    match transformation.trim().to_ascii_lowercase().as_str() {
        "uppercase" | "upper" => values.iter_mut().for_each(|v| *v = v.to_uppercase()),
        "lowercase" | "lower" => values.iter_mut().for_each(|v| *v = v.to_lowercase()),
        _ => {}
    }
}

/// Replace values with the display text of their codes when the mapping pairs a code column.
fn decode_code_column(
    domain: &Domain,
    source: &DataFrame,
    mapping: &MappingSuggestion,
    context: &PipelineContext,
    values: &mut [String],
) -> Result<()> {
    let (Some(vocabulary), Some(code_column)) = (&mapping.vocabulary, &mapping.code_column) else {
        return Ok(());
    };
    let Some(code_column) = find_column(source, code_column) else {
        warn!(
            domain = domain.code.as_str(),
            column = code_column.as_str(),
            "code column not in source; values copied undecoded"
        );
        return Ok(());
    };
    let codes = string_column(source, &code_column)?;
    let study_codelist = context
        .study_metadata
        .and_then(|metadata| metadata.codelist(vocabulary));
    let ct_codelist = context
        .terminology
        .and_then(|registry| registry.lookup(vocabulary));
    for (value, code) in values.iter_mut().zip(&codes) {
        if code.is_empty() {
            continue;
        }
        let decoded = study_codelist
            .and_then(|codelist| codelist.lookup_text(code))
            .or_else(|| ct_codelist.and_then(|codelist| decode_ct(codelist, code)));
        match decoded {
            Some(text) => *value = text,
            None if value.is_empty() => *value = code.clone(),
            None => {}
        }
    }
    Ok(())
}

fn decode_ct(codelist: &Codelist, code: &str) -> Option<String> {
    codelist
        .term_for_code(code)
        .or_else(|| codelist.lookup(code))
        .map(|term| term.submission_value.clone())
}

/// Set `STUDYID` and `DOMAIN` and derive blank `USUBJID` from `STUDYID-SUBJID`.
pub fn populate_identifiers(
    domain: &Domain,
    df: &mut DataFrame,
    config: &MappingConfig,
    context: &PipelineContext,
) -> Result<()> {
    let study_id = if config.study_id.trim().is_empty() {
        context.study_id.trim()
    } else {
        config.study_id.trim()
    };
    if let Some(column) = present(domain, df, "STUDYID")
        && !study_id.is_empty()
    {
        set_string_column(df, &column, vec![study_id.to_string(); df.height()])?;
    }
    if let Some(column) = present(domain, df, "DOMAIN") {
        set_string_column(df, &column, vec![domain.code.clone(); df.height()])?;
    }
    if let (Some(usubjid), Some(subjid)) = (present(domain, df, "USUBJID"), present(domain, df, "SUBJID")) {
        let studies = match present(domain, df, "STUDYID") {
            Some(column) => string_column(df, &column)?,
            None => vec![study_id.to_string(); df.height()],
        };
        let subjects = string_column(df, &subjid)?;
        let mut values = string_column(df, &usubjid)?;
        let mut derived = 0;
        for ((value, study), subject) in values.iter_mut().zip(&studies).zip(&subjects) {
            if value.is_empty() && !subject.is_empty() {
                *value = if study.is_empty() {
                    subject.clone()
                } else {
                    format!("{study}-{subject}")
                };
                derived += 1;
            }
        }
        if derived > 0 {
            debug!(domain = domain.code.as_str(), derived, "USUBJID derived from SUBJID");
            set_string_column(df, &usubjid, values)?;
        }
    }
    Ok(())
}

fn present(domain: &Domain, df: &DataFrame, name: &str) -> Option<String> {
    domain
        .column_name(name)
        .filter(|column| has_column(df, column))
        .map(str::to_string)
}

/// Character variables selected by `filter` that the frame carries.
fn char_variables<'d>(
    domain: &'d Domain,
    df: &DataFrame,
    filter: impl Fn(&Variable) -> bool,
) -> Vec<&'d Variable> {
    domain
        .variables
        .iter()
        .filter(|variable| variable.is_char() && filter(variable) && has_column(df, &variable.name))
        .collect()
}

/// Normalize date variables to ISO 8601; unparsable values become empty.
pub fn normalize_dates(domain: &Domain, df: &mut DataFrame) -> Result<()> {
    for variable in char_variables(domain, df, Variable::is_date_like) {
        let mut cleared = 0;
        map_string_column(df, &variable.name, |value| {
            if value.is_empty() {
                return String::new();
            }
            normalize_datetime(value).unwrap_or_else(|| {
                cleared += 1;
                String::new()
            })
        })?;
        if cleared > 0 {
            warn!(
                domain = domain.code.as_str(),
                variable = variable.name.as_str(),
                cleared,
                "unparsable dates cleared"
            );
        }
    }
    Ok(())
}

/// Study day for each `--DTC` that has a numeric `--DY` companion.
///
/// The reference date is the subject's entry in the context, else the row's
/// `RFSTDTC` when the domain carries one. References are normalized like any
/// other date. Safe to run again once later steps have filled more dates.
pub fn compute_study_days(domain: &Domain, df: &mut DataFrame, context: &PipelineContext) -> Result<()> {
    let pairs: Vec<(String, String)> = char_variables(domain, df, Variable::is_date_like)
        .into_iter()
        .filter_map(|variable| {
            let stem = variable.name.strip_suffix("DTC")?;
            let day = domain.variable(&format!("{stem}DY"))?;
            (day.data_type == VariableType::Num && has_column(df, &day.name))
                .then(|| (variable.name.clone(), day.name.clone()))
        })
        .collect();
    if pairs.is_empty() {
        return Ok(());
    }
    let subjects = match present(domain, df, "USUBJID") {
        Some(column) => string_column(df, &column)?,
        None => vec![String::new(); df.height()],
    };
    let row_reference = match present(domain, df, "RFSTDTC") {
        Some(column) => string_column(df, &column)?,
        None => vec![String::new(); df.height()],
    };
    let references: Vec<String> = subjects
        .iter()
        .zip(&row_reference)
        .map(|(subject, row)| {
            let raw = context
                .reference_starts
                .get(subject)
                .map(String::as_str)
                .unwrap_or(row.as_str());
            normalize_datetime(raw).unwrap_or_default()
        })
        .collect();
    for (dtc, dy) in pairs {
        let dates = string_column(df, &dtc)?;
        let existing = numeric_column(df, &dy)?;
        let days: Vec<Option<f64>> = dates
            .iter()
            .zip(&references)
            .zip(existing)
            .map(|((date, reference), existing)| {
                calculate_study_day(date, reference)
                    .map(|day| day as f64)
                    .or(existing.filter(|day| *day != 0.0))
            })
            .collect();
        set_f64_column(df, &dy, days)?;
    }
    Ok(())
}

/// Normalize duration variables; unparsable values become the configured placeholder.
pub fn normalize_durations(domain: &Domain, df: &mut DataFrame, options: &ProcessingOptions) -> Result<()> {
    for variable in char_variables(domain, df, Variable::is_duration_like) {
        let mut replaced = 0;
        map_string_column(df, &variable.name, |value| {
            if value.is_empty() {
                return String::new();
            }
            normalize_duration(value).unwrap_or_else(|| {
                replaced += 1;
                options.duration_placeholder.clone()
            })
        })?;
        if replaced > 0 {
            warn!(
                domain = domain.code.as_str(),
                variable = variable.name.as_str(),
                replaced,
                "unparsable durations replaced"
            );
        }
    }
    Ok(())
}

/// Normalize vocabulary-bound variables and record values outside them.
///
/// With several codelists bound to one variable, the first codelist that
/// recognizes a value wins. Unrecognized values stay as trimmed text.
pub fn normalize_vocabularies(
    domain: &Domain,
    df: &mut DataFrame,
    context: &PipelineContext,
    issues: &mut IssueLog,
) -> Result<()> {
    for variable in char_variables(domain, df, |variable| variable.codelist_code.is_some()) {
        let codelists = context.resolve_ct(domain, &variable.name);
        if codelists.is_empty() {
            continue;
        }
        let values: Vec<String> = string_column(df, &variable.name)?
            .into_iter()
            .map(|value| {
                codelists
                    .iter()
                    .find_map(|codelist| codelist.lookup(&value))
                    .map(|term| term.submission_value.clone())
                    .unwrap_or(value)
            })
            .collect();
        if codelists.iter().all(|codelist| !codelist.extensible) {
            let outside: Vec<&String> = values
                .iter()
                .filter(|value| {
                    !value.is_empty() && !codelists.iter().any(|codelist| codelist.contains(value))
                })
                .collect();
            if !outside.is_empty() {
                let distinct: BTreeSet<&str> = outside.iter().map(|value| value.as_str()).collect();
                let sample: Vec<&str> = distinct.iter().take(5).copied().collect();
                warn!(
                    domain = domain.code.as_str(),
                    variable = variable.name.as_str(),
                    count = outside.len(),
                    "values outside controlled terminology"
                );
                issues.push(BuildIssue::new(
                    IssueKind::VocabularyViolation,
                    Some(&variable.name),
                    outside.len(),
                    format!("values outside {}: {}", codes_of(&codelists), sample.join(", ")),
                ));
            }
        }
        set_string_column(df, &variable.name, values)?;
    }
    Ok(())
}

fn codes_of(codelists: &[&Codelist]) -> String {
    codelists
        .iter()
        .map(|codelist| codelist.code.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

/// Findings: fill blank standardized results from the original results.
pub fn standardize_results(domain: &Domain, df: &mut DataFrame) -> Result<()> {
    if !domain.is_findings() {
        return Ok(());
    }
    for (from, to) in [
        ("--ORRES", "--STRESC"),
        ("--ORRESU", "--STRESU"),
        ("--STRESC", "--STRESN"),
        ("--ORNRLO", "--STNRLO"),
        ("--ORNRHI", "--STNRHI"),
    ] {
        let (Some(source), Some(target)) = (present(domain, df, from), domain.variable(to)) else {
            continue;
        };
        if !has_column(df, &target.name) {
            continue;
        }
        copy_when_blank(df, &source, target)?;
    }
    Ok(())
}

fn copy_when_blank(df: &mut DataFrame, source: &str, target: &Variable) -> Result<()> {
    let from = string_column(df, source)?;
    match target.data_type {
        VariableType::Char => {
            let mut values = string_column(df, &target.name)?;
            for (value, fallback) in values.iter_mut().zip(&from) {
                if value.is_empty() {
                    value.clone_from(fallback);
                }
            }
            set_string_column(df, &target.name, values)
        }
        VariableType::Num => {
            let mut values = numeric_column(df, &target.name)?;
            for (value, fallback) in values.iter_mut().zip(&from) {
                if value.is_none() {
                    *value = parse_f64(fallback);
                }
            }
            set_f64_column(df, &target.name, values)
        }
    }
}

/// Drop permissible variables with no values, except those on the keep-list.
pub fn drop_empty_permissible(
    domain: &Domain,
    df: &mut DataFrame,
    options: &ProcessingOptions,
) -> Result<Vec<String>> {
    let mut dropped = Vec::new();
    for variable in domain.variables.iter().filter(|v| v.is_permissible()) {
        if !has_column(df, &variable.name) || options.keeps(&domain.code, &variable.name) {
            continue;
        }
        if missing_count(df, variable)? == df.height() {
            df.drop_in_place(&variable.name)?;
            dropped.push(variable.name.clone());
        }
    }
    if !dropped.is_empty() {
        debug!(
            domain = domain.code.as_str(),
            dropped = dropped.join(","),
            "empty permissible variables dropped"
        );
    }
    Ok(dropped)
}

fn missing_count(df: &DataFrame, variable: &Variable) -> Result<usize> {
    let count = match variable.data_type {
        VariableType::Char => string_column(df, &variable.name)?
            .iter()
            .filter(|value| value.is_empty())
            .count(),
        VariableType::Num => numeric_column(df, &variable.name)?
            .iter()
            .filter(|value| value.is_none())
            .count(),
    };
    Ok(count)
}

/// Declared variables in order, then extra columns, then lineage.
pub fn reorder_columns(domain: &Domain, df: &mut DataFrame) -> Result<()> {
    let mut order: Vec<String> = Vec::with_capacity(df.width());
    let mut seen = BTreeSet::new();
    for variable in &domain.variables {
        if has_column(df, &variable.name) && seen.insert(variable.name.clone()) {
            order.push(variable.name.clone());
        }
    }
    for name in df.get_column_names() {
        let name = name.to_string();
        if name != LINEAGE_COLUMN && seen.insert(name.clone()) {
            order.push(name);
        }
    }
    if has_column(df, LINEAGE_COLUMN) {
        order.push(LINEAGE_COLUMN.to_string());
    }
    *df = df.select(order)?;
    Ok(())
}

/// Fail when a required variable has missing values.
pub fn check_required_values(domain: &Domain, df: &DataFrame) -> Result<()> {
    let mut missing = Vec::new();
    for variable in domain.required_variables() {
        if !has_column(df, &variable.name) {
            continue;
        }
        let count = missing_count(df, variable)?;
        if count > 0 {
            missing.push(MissingValues {
                variable: variable.name.clone(),
                count,
            });
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(BuildError::RequiredValueMissing {
            domain: domain.code.clone(),
            variables: missing,
        }
        .into())
    }
}

/// Truncate character values to the declared length, counted in characters.
pub fn enforce_lengths(domain: &Domain, df: &mut DataFrame, issues: &mut IssueLog) -> Result<()> {
    for variable in char_variables(domain, df, |_| true) {
        let max = variable.max_length() as usize;
        let mut truncated = 0;
        map_string_column(df, &variable.name, |value| {
            if value.chars().count() > max {
                truncated += 1;
                value.chars().take(max).collect()
            } else {
                value.to_string()
            }
        })?;
        if truncated > 0 {
            warn!(
                domain = domain.code.as_str(),
                variable = variable.name.as_str(),
                truncated,
                max,
                "values truncated to declared length"
            );
            issues.push(BuildIssue::new(
                IssueKind::LengthOverflow,
                Some(&variable.name),
                truncated,
                format!("truncated to {max} characters"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdtm_model::CoreDesignation;

    fn domain() -> Domain {
        Domain::new(
            "XX",
            vec![
                Variable::new("USUBJID", VariableType::Char).with_core(CoreDesignation::Required),
                Variable::new("XXTERM", VariableType::Char)
                    .with_core(CoreDesignation::Required)
                    .with_length(5),
                Variable::new("XXVAL", VariableType::Num).with_core(CoreDesignation::Permissible),
                Variable::new("XXNOTE", VariableType::Char).with_core(CoreDesignation::Permissible),
            ],
        )
    }

    #[test]
    fn allocation_types_every_variable() {
        let df = allocate_frame(&domain(), 3).expect("allocate");
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 5);
        assert_eq!(numeric_column(&df, "XXVAL").expect("val"), vec![None; 3]);
        assert_eq!(string_column(&df, "XXTERM").expect("term"), vec![""; 3]);
    }

    #[test]
    fn empty_permissible_are_dropped_and_required_checked() {
        let domain = domain();
        let mut df = allocate_frame(&domain, 2).expect("allocate");
        set_string_column(&mut df, "XXNOTE", vec!["a".into(), String::new()]).expect("note");
        let dropped =
            drop_empty_permissible(&domain, &mut df, &ProcessingOptions::default()).expect("drop");
        assert_eq!(dropped, vec!["XXVAL"]);
        let error = check_required_values(&domain, &df).expect_err("required missing");
        let build = error.downcast_ref::<BuildError>().expect("build error");
        assert_eq!(build.missing_variables(), vec!["USUBJID", "XXTERM"]);
    }

    #[test]
    fn truncation_counts_characters() {
        let domain = domain();
        let mut df = allocate_frame(&domain, 2).expect("allocate");
        set_string_column(&mut df, "XXTERM", vec!["ééééééé".into(), "ok".into()]).expect("term");
        let mut issues = IssueLog::new("XX");
        enforce_lengths(&domain, &mut df, &mut issues).expect("lengths");
        assert_eq!(string_column(&df, "XXTERM").expect("term"), vec!["ééééé", "ok"]);
        assert_eq!(issues.count_of(IssueKind::LengthOverflow), 1);
    }

    #[test]
    fn reorder_puts_extras_after_declared() {
        let domain = domain();
        let mut df = allocate_frame(&domain, 1).expect("allocate");
        set_string_column(&mut df, "EXTRA", vec!["x".into()]).expect("extra");
        df.drop_in_place("USUBJID").expect("drop");
        set_string_column(&mut df, "USUBJID", vec!["S1".into()]).expect("usubjid");
        reorder_columns(&domain, &mut df).expect("reorder");
        let names: Vec<String> = df.get_column_names().iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec!["USUBJID", "XXTERM", "XXVAL", "XXNOTE", "EXTRA", LINEAGE_COLUMN]
        );
    }
}
