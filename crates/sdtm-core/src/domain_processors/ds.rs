//! Disposition (DS) domain processor.
//!
//! Every subject ends up with an informed-consent milestone and a disposition
//! event. Missing ones are synthesized as companion rows, which carry no
//! source lineage.

use std::collections::BTreeSet;

use anyhow::Result;
use polars::prelude::DataFrame;
use sdtm_model::Domain;
use tracing::debug;

use crate::data_utils::set_f64_column;
use crate::frame_utils::{NewRow, append_rows, drop_column, sort_rows};
use crate::pipeline_context::PipelineContext;
use crate::sequence::{number_in_row_order, sequence_columns};

use super::common::{backfill, col, dedupe_on, map_values, set_string_column, string_column};
use super::processor_trait::DomainProcessor;

pub const CONSENT: &str = "INFORMED CONSENT OBTAINED";
pub const COMPLETED: &str = "COMPLETED";
pub const PROTOCOL_MILESTONE: &str = "PROTOCOL MILESTONE";
pub const DISPOSITION_EVENT: &str = "DISPOSITION EVENT";

/// Temporary sort key: milestones before other events on the same date.
const RANK_COLUMN: &str = "__ds_rank";

/// Free-text spellings seen in disposition exports.
fn decod_synonyms() -> std::collections::HashMap<String, String> {
    map_values([
        ("SCREEN FAIL", "SCREEN FAILURE"),
        ("SCREENING FAILURE", "SCREEN FAILURE"),
        ("FAILED SCREENING", "SCREEN FAILURE"),
        ("WITHDRAWN", "WITHDRAWAL BY SUBJECT"),
        ("WITHDREW", "WITHDRAWAL BY SUBJECT"),
        ("WITHDREW CONSENT", "WITHDRAWAL BY SUBJECT"),
        ("CONSENT WITHDRAWN", "WITHDRAWAL BY SUBJECT"),
        ("SUBJECT WITHDRAWAL", "WITHDRAWAL BY SUBJECT"),
        ("LOST TO FOLLOW UP", "LOST TO FOLLOW-UP"),
        ("LOST TO FOLLOWUP", "LOST TO FOLLOW-UP"),
        ("LTFU", "LOST TO FOLLOW-UP"),
        ("CONSENT", CONSENT),
        ("CONSENTED", CONSENT),
        ("INFORMED CONSENT", CONSENT),
        ("INFORMED CONSENT SIGNED", CONSENT),
        ("COMPLETE", COMPLETED),
        ("COMPLETED STUDY", COMPLETED),
        ("STUDY COMPLETED", COMPLETED),
    ])
}

pub struct DsProcessor;

impl DomainProcessor for DsProcessor {
    fn domain_code(&self) -> &'static str {
        "DS"
    }

    fn description(&self) -> &'static str {
        "Disposition: decoded terms, categories and companion milestone rows"
    }

    fn process(&self, domain: &Domain, df: &mut DataFrame, context: &PipelineContext) -> Result<()> {
        let (Some(usubjid), Some(decod)) = (col(domain, df, "USUBJID"), col(domain, df, "DSDECOD"))
        else {
            return Ok(());
        };

        backfill(domain, df, "DSTERM", "DSDECOD")?;
        normalize_decod(domain, df, context, &decod)?;
        backfill(domain, df, "DSDECOD", "DSTERM")?;

        let milestones = milestone_values(domain, context);
        if let Some(cat) = col(domain, df, "DSCAT") {
            derive_category(df, &decod, &cat, &milestones)?;
        }

        add_companion_rows(domain, df, context, &usubjid, &decod, &milestones)?;
        dedupe_on(
            domain,
            df,
            &["USUBJID", "DSDECOD", "DSTERM", "DSCAT", "DSSTDTC"],
        )?;
        sequence_milestones_first(domain, df, &decod, &milestones)
    }
}

fn normalize_decod(
    domain: &Domain,
    df: &mut DataFrame,
    context: &PipelineContext,
    decod: &str,
) -> Result<()> {
    let codelists = context.resolve_ct(domain, decod);
    let synonyms = decod_synonyms();
    let values = string_column(df, decod)?
        .into_iter()
        .map(|value| {
            let upper = value.to_uppercase();
            if let Some(mapped) = synonyms.get(&upper) {
                return mapped.clone();
            }
            codelists
                .iter()
                .find_map(|codelist| codelist.lookup(&value))
                .map(|term| term.submission_value.clone())
                .unwrap_or(value)
        })
        .collect();
    set_string_column(df, decod, values)
}

/// Upper-cased decoded values that are protocol milestones.
fn milestone_values(domain: &Domain, context: &PipelineContext) -> BTreeSet<String> {
    let mut values: BTreeSet<String> = [CONSENT, "RANDOMIZED"]
        .into_iter()
        .map(str::to_string)
        .collect();
    for codelist in context.resolve_ct(domain, "DSDECOD") {
        if codelist.name.to_uppercase().contains("MILESTONE") {
            values.extend(
                codelist
                    .submission_values()
                    .into_iter()
                    .map(str::to_uppercase),
            );
        }
    }
    values
}

fn is_milestone(milestones: &BTreeSet<String>, decod: &str) -> bool {
    milestones.contains(&decod.to_uppercase())
}

fn derive_category(
    df: &mut DataFrame,
    decod: &str,
    cat: &str,
    milestones: &BTreeSet<String>,
) -> Result<()> {
    let decods = string_column(df, decod)?;
    let mut cats = string_column(df, cat)?;
    for (category, value) in cats.iter_mut().zip(&decods) {
        if !category.is_empty() || value.is_empty() {
            continue;
        }
        *category = if is_milestone(milestones, value) {
            PROTOCOL_MILESTONE
        } else {
            DISPOSITION_EVENT
        }
        .to_string();
    }
    set_string_column(df, cat, cats)
}

fn add_companion_rows(
    domain: &Domain,
    df: &mut DataFrame,
    context: &PipelineContext,
    usubjid: &str,
    decod: &str,
    milestones: &BTreeSet<String>,
) -> Result<()> {
    let subjects = string_column(df, usubjid)?;
    let decods = string_column(df, decod)?;
    let cats = match col(domain, df, "DSCAT") {
        Some(cat) => string_column(df, &cat)?,
        None => vec![String::new(); df.height()],
    };
    let studyids = match col(domain, df, "STUDYID") {
        Some(studyid) => string_column(df, &studyid)?,
        None => vec![context.study_id.clone(); df.height()],
    };

    let mut order: Vec<&str> = Vec::new();
    let mut consented = BTreeSet::new();
    let mut disposed = BTreeSet::new();
    let mut study_of = std::collections::BTreeMap::new();
    for idx in 0..df.height() {
        let subject = subjects[idx].as_str();
        if subject.is_empty() {
            continue;
        }
        if study_of.insert(subject, studyids[idx].as_str()).is_none() {
            order.push(subject);
        }
        if decods[idx].eq_ignore_ascii_case(CONSENT) {
            consented.insert(subject);
        } else if cats[idx].eq_ignore_ascii_case(DISPOSITION_EVENT)
            || (cats[idx].is_empty()
                && !decods[idx].is_empty()
                && !is_milestone(milestones, &decods[idx]))
        {
            disposed.insert(subject);
        }
    }

    let names = |name: &str| domain.column_name(name).map(str::to_string);
    let mut rows: Vec<NewRow> = Vec::new();
    for subject in order {
        let base = |term: &str, category: &str| -> NewRow {
            let mut row = Vec::new();
            for (name, value) in [
                ("STUDYID", study_of.get(subject).copied().unwrap_or_default()),
                ("DOMAIN", domain.code.as_str()),
                ("USUBJID", subject),
                ("DSTERM", term),
                ("DSDECOD", term),
                ("DSCAT", category),
            ] {
                if let Some(column) = names(name) {
                    row.push((column, value.to_string()));
                }
            }
            row
        };
        if !consented.contains(subject) {
            rows.push(base(CONSENT, PROTOCOL_MILESTONE));
        }
        if !disposed.contains(subject) {
            rows.push(base(COMPLETED, DISPOSITION_EVENT));
        }
    }
    if !rows.is_empty() {
        debug!(
            domain = domain.code.as_str(),
            added = rows.len(),
            "synthesized disposition companion rows"
        );
        append_rows(df, &rows)?;
    }
    Ok(())
}

fn sequence_milestones_first(
    domain: &Domain,
    df: &mut DataFrame,
    decod: &str,
    milestones: &BTreeSet<String>,
) -> Result<()> {
    let Some((usubjid, seq)) = sequence_columns(domain, df) else {
        return Ok(());
    };
    let rank: Vec<Option<f64>> = string_column(df, decod)?
        .iter()
        .map(|value| Some(if is_milestone(milestones, value) { 0.0 } else { 1.0 }))
        .collect();
    set_f64_column(df, RANK_COLUMN, rank)?;
    let mut keys = vec![usubjid.clone()];
    keys.extend(domain.column_name("DSSTDTC").map(str::to_string));
    keys.push(RANK_COLUMN.to_string());
    sort_rows(df, &keys)?;
    drop_column(df, RANK_COLUMN)?;
    number_in_row_order(df, &usubjid, &seq)
}
