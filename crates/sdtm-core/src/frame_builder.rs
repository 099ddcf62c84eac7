//! Canonical frame construction from source tables.
//!
//! - [`build_domain_frame`]: run the pipeline with an existing mapping configuration
//! - [`build_mapped_domain_frame`]: suggest mappings first, then build

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use polars::prelude::DataFrame;
use tracing::{debug, info};

use sdtm_map::MappingEngine;
use sdtm_model::{BuildIssue, ColumnHint, Domain, IssueKind, MappingConfig};

use crate::data_utils::{parse_f64, string_column};
use crate::frame::DomainFrame;
use crate::frame_utils::{LINEAGE_COLUMN, drop_column, lineage};
use crate::pipeline::DomainPipeline;
use crate::pipeline_context::PipelineContext;

/// Build the canonical table for one domain.
///
/// # Errors
///
/// A [`BuildError`](crate::BuildError) (inside the `anyhow::Error`) when a mapped
/// source column is absent or, unless lenient, a required variable has missing
/// values. No partial frame is returned on failure.
pub fn build_domain_frame(
    domain: &Domain,
    source: &DataFrame,
    config: &MappingConfig,
    context: &PipelineContext,
) -> Result<DomainFrame> {
    let (mut data, issues) = DomainPipeline::standard().run(domain, source, config, context)?;
    let source_rows = lineage(&data)?;
    drop_column(&mut data, LINEAGE_COLUMN)?;
    info!(
        domain = domain.code.as_str(),
        source_rows = source.height(),
        records = data.height(),
        issues = issues.issues.len(),
        "domain frame built"
    );
    Ok(DomainFrame {
        domain_code: domain.code.clone(),
        data,
        source_rows,
        issues,
    })
}

/// Result of mapping and building one source table.
#[derive(Debug, Clone)]
pub struct MappedDomainFrame {
    pub config: MappingConfig,
    pub frame: DomainFrame,
    /// Source columns consumed by mappings, including code columns.
    pub used_columns: BTreeSet<String>,
}

/// Suggest mappings for `source` with the context's terminology and study
/// metadata, then build. Low-confidence columns are reported as
/// [`IssueKind::MappingAmbiguity`] on the frame.
pub fn build_mapped_domain_frame(
    domain: &Domain,
    source: &DataFrame,
    min_confidence: f32,
    context: &PipelineContext,
) -> Result<MappedDomainFrame> {
    let mut engine = MappingEngine::new(domain.clone(), min_confidence, column_hints(source)?);
    if let Some(terminology) = context.terminology {
        engine = engine.with_terminology(terminology);
    }
    if let Some(metadata) = context.study_metadata {
        engine = engine.with_study_metadata(metadata);
    }
    let headers: Vec<String> = source
        .get_column_names()
        .iter()
        .map(ToString::to_string)
        .collect();
    let result = engine.suggest(&headers);
    let ambiguous = result.ambiguous.clone();
    let config = engine.to_config(&context.study_id, result);
    debug!(
        domain = domain.code.as_str(),
        mapped = config.mappings.len(),
        unmapped = config.unmapped_columns.len(),
        "mapping suggested"
    );

    let mut frame = build_domain_frame(domain, source, &config, context)?;
    for column in ambiguous {
        frame.issues.push(BuildIssue::new(
            IssueKind::MappingAmbiguity,
            column.best_target.as_deref(),
            1,
            format!(
                "{} best score {:.2} below {:.2}",
                column.source_column, column.best_score, min_confidence
            ),
        ));
    }
    let used_columns = config.used_source_columns();
    Ok(MappedDomainFrame {
        config,
        frame,
        used_columns,
    })
}

/// Per-column numeric share, cardinality and null ratio of a source table.
pub fn column_hints(df: &DataFrame) -> Result<BTreeMap<String, ColumnHint>> {
    let mut hints = BTreeMap::new();
    for name in df.get_column_names() {
        let values = string_column(df, name.as_str())?;
        let total = values.len();
        let present: Vec<&String> = values.iter().filter(|value| !value.is_empty()).collect();
        let hint = if total == 0 {
            ColumnHint {
                null_ratio: 1.0,
                ..ColumnHint::default()
            }
        } else {
            let unique: BTreeSet<&str> = present.iter().map(|value| value.as_str()).collect();
            let numeric = present.iter().filter(|value| parse_f64(value).is_some()).count();
            ColumnHint {
                is_numeric: !present.is_empty() && numeric == present.len(),
                unique_ratio: unique.len() as f64 / total as f64,
                null_ratio: (total - present.len()) as f64 / total as f64,
                label: None,
            }
        };
        hints.insert(name.to_string(), hint);
    }
    Ok(hints)
}
