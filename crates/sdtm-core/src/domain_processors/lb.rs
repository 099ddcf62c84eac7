//! Laboratory Test Results (LB) domain processor.

use anyhow::Result;
use polars::prelude::DataFrame;
use sdtm_model::Domain;

use crate::pipeline_context::PipelineContext;

use super::common::{
    assign_sequence, col, dedupe_on, numeric_column, set_string_column, string_column,
};
use super::findings::{NATURAL_KEY, SEQUENCE_KEYS, derive_test_pairs, mark_not_done};
use super::processor_trait::DomainProcessor;

pub struct LbProcessor;

impl DomainProcessor for LbProcessor {
    fn domain_code(&self) -> &'static str {
        "LB"
    }

    fn description(&self) -> &'static str {
        "Laboratory results: test pairing, not-done status, reference range indicator"
    }

    fn process(&self, domain: &Domain, df: &mut DataFrame, context: &PipelineContext) -> Result<()> {
        derive_test_pairs(domain, df, context)?;
        mark_not_done(domain, df)?;
        derive_range_indicator(domain, df)?;
        dedupe_on(domain, df, NATURAL_KEY)?;
        assign_sequence(domain, df, SEQUENCE_KEYS)
    }
}

/// Range indicator of a numeric result; `None` when there is no bound to compare with.
pub(crate) fn range_indicator(value: f64, low: Option<f64>, high: Option<f64>) -> Option<&'static str> {
    if low.is_some_and(|low| value < low) {
        Some("LOW")
    } else if high.is_some_and(|high| value > high) {
        Some("HIGH")
    } else if low.is_some() || high.is_some() {
        Some("NORMAL")
    } else {
        None
    }
}

/// Fill blank `LBNRIND` from `LBSTRESN` against `LBSTNRLO`/`LBSTNRHI`.
fn derive_range_indicator(domain: &Domain, df: &mut DataFrame) -> Result<()> {
    let (Some(nrind), Some(stresn)) = (col(domain, df, "LBNRIND"), col(domain, df, "LBSTRESN"))
    else {
        return Ok(());
    };
    let bound = |name: &str| -> Result<Vec<Option<f64>>> {
        match col(domain, df, name) {
            Some(column) => numeric_column(df, &column),
            None => Ok(vec![None; df.height()]),
        }
    };
    let lows = bound("LBSTNRLO")?;
    let highs = bound("LBSTNRHI")?;
    let results = numeric_column(df, &stresn)?;
    let mut indicators = string_column(df, &nrind)?;
    let mut changed = false;
    for (idx, indicator) in indicators.iter_mut().enumerate() {
        if !indicator.is_empty() {
            continue;
        }
        if let Some(value) = results[idx]
            && let Some(derived) = range_indicator(value, lows[idx], highs[idx])
        {
            *indicator = derived.to_string();
            changed = true;
        }
    }
    if changed {
        set_string_column(df, &nrind, indicators)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::range_indicator;

    #[test]
    fn indicator_compares_against_available_bounds() {
        assert_eq!(range_indicator(5.0, Some(10.0), Some(40.0)), Some("LOW"));
        assert_eq!(range_indicator(55.0, Some(10.0), Some(40.0)), Some("HIGH"));
        assert_eq!(range_indicator(40.0, Some(10.0), Some(40.0)), Some("NORMAL"));
        assert_eq!(range_indicator(55.0, None, Some(40.0)), Some("HIGH"));
        assert_eq!(range_indicator(55.0, None, None), None);
    }
}
