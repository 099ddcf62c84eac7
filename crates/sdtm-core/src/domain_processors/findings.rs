//! Rules shared by the findings processors (VS, LB).

use anyhow::Result;
use polars::prelude::DataFrame;
use sdtm_model::{Codelist, Domain};

use crate::pipeline_context::PipelineContext;

use super::common::{col, first_codelist, set_string_column, string_column};

pub(super) const NOT_DONE: &str = "NOT DONE";

/// Resolve a value in `from` to the term sharing its NCI code in `to`.
fn paired_value(from: &Codelist, to: &Codelist, value: &str) -> Option<String> {
    let code = from.nci_code(value)?;
    to.term_for_code(code)
        .map(|term| term.submission_value.clone())
}

/// Fill blank `--TESTCD` from `--TEST` and blank `--TEST` from `--TESTCD`.
///
/// Test codes and test names live in separate codelists whose terms share NCI
/// codes, so the pairing goes through the shared code.
pub(super) fn derive_test_pairs(
    domain: &Domain,
    df: &mut DataFrame,
    context: &PipelineContext,
) -> Result<()> {
    let (Some(testcd_col), Some(test_col)) = (col(domain, df, "--TESTCD"), col(domain, df, "--TEST"))
    else {
        return Ok(());
    };
    let (Some(testcd_ct), Some(test_ct)) = (
        first_codelist(domain, context, &testcd_col),
        first_codelist(domain, context, &test_col),
    ) else {
        return Ok(());
    };
    let mut codes = string_column(df, &testcd_col)?;
    let mut names = string_column(df, &test_col)?;
    let (mut codes_changed, mut names_changed) = (false, false);
    for (code, name) in codes.iter_mut().zip(names.iter_mut()) {
        if code.is_empty() && !name.is_empty() {
            let derived = paired_value(test_ct, testcd_ct, name)
                .or_else(|| testcd_ct.lookup(name).map(|term| term.submission_value.clone()));
            if let Some(derived) = derived {
                *code = derived;
                codes_changed = true;
            }
        } else if name.is_empty()
            && !code.is_empty()
            && let Some(derived) = paired_value(testcd_ct, test_ct, code)
        {
            *name = derived;
            names_changed = true;
        }
    }
    if codes_changed {
        set_string_column(df, &testcd_col, codes)?;
    }
    if names_changed {
        set_string_column(df, &test_col, names)?;
    }
    Ok(())
}

/// `--STAT = NOT DONE` when the result is blank and a reason is given.
pub(super) fn mark_not_done(domain: &Domain, df: &mut DataFrame) -> Result<()> {
    let (Some(stat), Some(orres), Some(reasnd)) = (
        col(domain, df, "--STAT"),
        col(domain, df, "--ORRES"),
        col(domain, df, "--REASND"),
    ) else {
        return Ok(());
    };
    let results = string_column(df, &orres)?;
    let reasons = string_column(df, &reasnd)?;
    let mut status = string_column(df, &stat)?;
    let mut changed = false;
    for ((status, result), reason) in status.iter_mut().zip(&results).zip(&reasons) {
        if status.is_empty() && result.is_empty() && !reason.is_empty() {
            *status = NOT_DONE.to_string();
            changed = true;
        }
    }
    if changed {
        set_string_column(df, &stat, status)?;
    }
    Ok(())
}

pub(super) const SEQUENCE_KEYS: &[&str] = &["--DTC", "VISITNUM", "--TESTCD"];
pub(super) const NATURAL_KEY: &[&str] = &["USUBJID", "--TESTCD", "--DTC", "VISITNUM"];
