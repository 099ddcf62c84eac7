//! Vital Signs (VS) domain processor.

use anyhow::Result;
use polars::prelude::DataFrame;
use sdtm_model::Domain;

use crate::pipeline_context::PipelineContext;

use super::common::{assign_sequence, dedupe_on};
use super::findings::{NATURAL_KEY, SEQUENCE_KEYS, derive_test_pairs, mark_not_done};
use super::processor_trait::DomainProcessor;

pub struct VsProcessor;

impl DomainProcessor for VsProcessor {
    fn domain_code(&self) -> &'static str {
        "VS"
    }

    fn description(&self) -> &'static str {
        "Vital signs: test code/name pairing, not-done status"
    }

    fn process(&self, domain: &Domain, df: &mut DataFrame, context: &PipelineContext) -> Result<()> {
        derive_test_pairs(domain, df, context)?;
        mark_not_done(domain, df)?;
        dedupe_on(domain, df, NATURAL_KEY)?;
        assign_sequence(domain, df, SEQUENCE_KEYS)
    }
}
