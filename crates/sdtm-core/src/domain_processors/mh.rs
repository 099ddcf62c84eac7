//! Medical History (MH) domain processor.

use anyhow::Result;
use polars::prelude::DataFrame;
use sdtm_model::Domain;

use crate::pipeline_context::PipelineContext;

use super::common::{apply_map_upper, assign_sequence, backfill, cols, yn_mapping};
use super::processor_trait::DomainProcessor;

pub struct MhProcessor;

impl DomainProcessor for MhProcessor {
    fn domain_code(&self) -> &'static str {
        "MH"
    }

    fn process(&self, domain: &Domain, df: &mut DataFrame, _context: &PipelineContext) -> Result<()> {
        backfill(domain, df, "MHTERM", "MHDECOD")?;
        let yn = yn_mapping();
        for flag in cols(domain, df, &["MHPRESP", "MHOCCUR"]) {
            apply_map_upper(df, &flag, &yn)?;
        }
        assign_sequence(domain, df, &["MHSTDTC", "MHTERM"])
    }
}
