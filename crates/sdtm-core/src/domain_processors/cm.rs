//! Concomitant Medications (CM) domain processor.

use anyhow::Result;
use polars::prelude::DataFrame;
use sdtm_model::Domain;

use crate::pipeline_context::PipelineContext;

use super::common::{assign_sequence, backfill, dedupe_on, warn_date_pair_order};
use super::processor_trait::DomainProcessor;

pub struct CmProcessor;

impl DomainProcessor for CmProcessor {
    fn domain_code(&self) -> &'static str {
        "CM"
    }

    fn description(&self) -> &'static str {
        "Concomitant medications: standardized name backfill"
    }

    fn process(&self, domain: &Domain, df: &mut DataFrame, _context: &PipelineContext) -> Result<()> {
        backfill(domain, df, "CMTRT", "CMDECOD")?;
        warn_date_pair_order(domain, df, "CMSTDTC", "CMENDTC")?;
        dedupe_on(domain, df, &["USUBJID", "CMTRT", "CMSTDTC"])?;
        assign_sequence(domain, df, &["CMSTDTC", "CMTRT"])
    }
}
