//! Adverse Events (AE) domain processor.

use anyhow::Result;
use polars::prelude::DataFrame;
use sdtm_model::Domain;

use crate::pipeline_context::PipelineContext;

use super::common::{
    apply_map_upper, assign_sequence, backfill, cols, dedupe_on, default_outside_vocabulary,
    warn_date_pair_order, yn_mapping,
};
use super::processor_trait::DomainProcessor;

/// Y/N flag variables of the AE domain.
const AE_FLAGS: &[&str] = &[
    "AESER", "AESCAN", "AESCONG", "AESDISAB", "AESDTH", "AESHOSP", "AESLIFE", "AESOD", "AESMIE",
    "AECONTRT", "AESINTV",
];

pub struct AeProcessor;

impl DomainProcessor for AeProcessor {
    fn domain_code(&self) -> &'static str {
        "AE"
    }

    fn description(&self) -> &'static str {
        "Adverse events: severity defaulting, seriousness flags, dictionary term backfill"
    }

    fn process(&self, domain: &Domain, df: &mut DataFrame, context: &PipelineContext) -> Result<()> {
        default_outside_vocabulary(domain, df, context, "AESEV", "MILD", false)?;

        let yn = yn_mapping();
        for flag in cols(domain, df, AE_FLAGS) {
            apply_map_upper(df, &flag, &yn)?;
        }

        backfill(domain, df, "AETERM", "AEDECOD")?;
        warn_date_pair_order(domain, df, "AESTDTC", "AEENDTC")?;

        dedupe_on(domain, df, &["USUBJID", "AETERM", "AESTDTC"])?;
        assign_sequence(domain, df, &["AESTDTC", "AETERM"])
    }
}
