//! Demographics (DM) domain processor.

use anyhow::Result;
use polars::prelude::DataFrame;
use sdtm_model::Domain;

use crate::data_utils::set_f64_column;
use crate::pipeline_context::PipelineContext;

use super::common::{
    col, dedupe_on, default_outside_vocabulary, numeric_column, set_string_column, string_column,
};
use super::processor_trait::DomainProcessor;

pub struct DmProcessor;

impl DomainProcessor for DmProcessor {
    fn domain_code(&self) -> &'static str {
        "DM"
    }

    fn description(&self) -> &'static str {
        "Demographics: age units, sex defaulting, one record per subject"
    }

    fn process(&self, domain: &Domain, df: &mut DataFrame, context: &PipelineContext) -> Result<()> {
        let age = col(domain, df, "AGE");
        if let Some(age) = &age {
            let values = numeric_column(df, age)?;
            set_f64_column(df, age, values)?;
        }

        // AGEU defaults to YEARS when AGE is present.
        if let (Some(age), Some(ageu)) = (&age, col(domain, df, "AGEU")) {
            let ages = numeric_column(df, age)?;
            let mut units = string_column(df, &ageu)?;
            let mut changed = false;
            for (unit, age) in units.iter_mut().zip(&ages) {
                if unit.is_empty() && age.is_some() {
                    *unit = "YEARS".to_string();
                    changed = true;
                }
            }
            if changed {
                set_string_column(df, &ageu, units)?;
            }
        }

        default_outside_vocabulary(domain, df, context, "SEX", "U", true)?;

        if let Some(country) = col(domain, df, "COUNTRY") {
            let values = string_column(df, &country)?
                .into_iter()
                .map(|value| value.to_uppercase())
                .collect();
            set_string_column(df, &country, values)?;
        }

        dedupe_on(domain, df, &["USUBJID"])?;
        Ok(())
    }
}
