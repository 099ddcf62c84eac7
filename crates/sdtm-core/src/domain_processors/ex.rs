//! Exposure (EX) domain processor.

use anyhow::Result;
use polars::prelude::DataFrame;
use sdtm_model::Domain;

use crate::pipeline_context::PipelineContext;

use super::common::{assign_sequence, backfill, dedupe_on, warn_date_pair_order};
use super::processor_trait::DomainProcessor;

pub struct ExProcessor;

impl DomainProcessor for ExProcessor {
    fn domain_code(&self) -> &'static str {
        "EX"
    }

    fn description(&self) -> &'static str {
        "Exposure: single-dose end dates"
    }

    fn process(&self, domain: &Domain, df: &mut DataFrame, _context: &PipelineContext) -> Result<()> {
        // A dose without an end date ends when it starts.
        backfill(domain, df, "EXSTDTC", "EXENDTC")?;
        warn_date_pair_order(domain, df, "EXSTDTC", "EXENDTC")?;
        dedupe_on(domain, df, &["USUBJID", "EXTRT", "EXSTDTC"])?;
        assign_sequence(domain, df, &["EXSTDTC", "EXTRT"])
    }
}
