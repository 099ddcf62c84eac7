//! The canonical record pipeline: a fixed sequence of processing steps.
//!
//! # Step Order
//!
//! 1. **allocate** - every domain variable, typed and empty, plus row lineage
//! 2. **copy_mapped** - mapped source values, code columns decoded first
//! 3. **identifiers** - STUDYID, DOMAIN, derived USUBJID
//! 4. **dates** - ISO 8601 dates; unparsable values become empty
//! 5. **study_days** - `--DY` from `--DTC` and the subject's reference start
//! 6. **durations** - ISO 8601 durations; unparsable values become the placeholder
//! 7. **terminology** - controlled terminology normalization
//! 8. **standardized_results** - findings `--STRESC`/`--STRESN`/`--STRESU`
//! 9. **domain_processor** - domain rules, then dense sequence numbering and
//!    study days for any dates the rules filled in
//! 10. **drop_empty_permissible** - wholly empty permissible variables removed
//! 11. **reorder** - declared variable order, extras after
//! 12. **required_values** - required variables must be complete unless lenient
//! 13. **lengths** - character values truncated to the declared length
//!
//! Later steps rely on earlier ones, so the order is fixed.

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use tracing::debug;

use sdtm_model::{BuildIssue, Domain, IssueKind, IssueLog, MappingConfig};

use crate::pipeline_context::PipelineContext;
use crate::processor;
use crate::sequence::{count_collisions, ensure_dense_sequence, sequence_columns};

/// Inputs and findings shared across steps of one build.
pub struct PipelineState<'s> {
    pub source: &'s DataFrame,
    pub config: &'s MappingConfig,
    pub issues: IssueLog,
    /// Step names in execution order.
    pub executed_steps: Vec<&'static str>,
}

impl<'s> PipelineState<'s> {
    pub fn new(domain: &Domain, source: &'s DataFrame, config: &'s MappingConfig) -> Self {
        Self {
            source,
            config,
            issues: IssueLog::new(domain.code.clone()),
            executed_steps: Vec::new(),
        }
    }
}

/// A single step of the pipeline.
pub trait ProcessingStep: Send + Sync {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        ctx: &PipelineContext<'_>,
        state: &mut PipelineState<'_>,
    ) -> Result<()>;

    fn step_name(&self) -> &'static str;
}

/// The ordered steps of a domain build.
pub struct DomainPipeline {
    steps: Vec<Box<dyn ProcessingStep>>,
}

impl Default for DomainPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl DomainPipeline {
    pub fn standard() -> Self {
        let steps: Vec<Box<dyn ProcessingStep>> = vec![
            Box::new(AllocateStep),
            Box::new(CopyMappedStep),
            Box::new(IdentifiersStep),
            Box::new(DatesStep),
            Box::new(StudyDaysStep),
            Box::new(DurationsStep),
            Box::new(TerminologyStep),
            Box::new(StandardizedResultsStep),
            Box::new(DomainProcessorStep),
            Box::new(DropEmptyPermissibleStep),
            Box::new(ReorderStep),
            Box::new(RequiredValuesStep),
            Box::new(LengthsStep),
        ];
        Self { steps }
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.step_name()).collect()
    }

    /// Run every step and return the canonical frame with its lineage column.
    pub fn run(
        &self,
        domain: &Domain,
        source: &DataFrame,
        config: &MappingConfig,
        ctx: &PipelineContext<'_>,
    ) -> Result<(DataFrame, IssueLog)> {
        let mut state = PipelineState::new(domain, source, config);
        let mut df = DataFrame::empty();
        for step in &self.steps {
            step.execute(domain, &mut df, ctx, &mut state)
                .with_context(|| format!("{} step {}", domain.code, step.step_name()))?;
            debug!(
                domain = domain.code.as_str(),
                step = step.step_name(),
                rows = df.height(),
                columns = df.width(),
                "pipeline step complete"
            );
            state.executed_steps.push(step.step_name());
        }
        Ok((df, state.issues))
    }
}

pub struct AllocateStep;

impl ProcessingStep for AllocateStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        _ctx: &PipelineContext<'_>,
        state: &mut PipelineState<'_>,
    ) -> Result<()> {
        *df = processor::allocate_frame(domain, state.source.height())?;
        Ok(())
    }

    fn step_name(&self) -> &'static str {
        "allocate"
    }
}

pub struct CopyMappedStep;

impl ProcessingStep for CopyMappedStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        ctx: &PipelineContext<'_>,
        state: &mut PipelineState<'_>,
    ) -> Result<()> {
        processor::copy_mapped_values(domain, df, state.source, state.config, ctx)
    }

    fn step_name(&self) -> &'static str {
        "copy_mapped"
    }
}

pub struct IdentifiersStep;

impl ProcessingStep for IdentifiersStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        ctx: &PipelineContext<'_>,
        state: &mut PipelineState<'_>,
    ) -> Result<()> {
        processor::populate_identifiers(domain, df, state.config, ctx)
    }

    fn step_name(&self) -> &'static str {
        "identifiers"
    }
}

pub struct DatesStep;

impl ProcessingStep for DatesStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        _ctx: &PipelineContext<'_>,
        _state: &mut PipelineState<'_>,
    ) -> Result<()> {
        processor::normalize_dates(domain, df)
    }

    fn step_name(&self) -> &'static str {
        "dates"
    }
}

pub struct StudyDaysStep;

impl ProcessingStep for StudyDaysStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        ctx: &PipelineContext<'_>,
        _state: &mut PipelineState<'_>,
    ) -> Result<()> {
        processor::compute_study_days(domain, df, ctx)
    }

    fn step_name(&self) -> &'static str {
        "study_days"
    }
}

pub struct DurationsStep;

impl ProcessingStep for DurationsStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        ctx: &PipelineContext<'_>,
        _state: &mut PipelineState<'_>,
    ) -> Result<()> {
        processor::normalize_durations(domain, df, &ctx.options)
    }

    fn step_name(&self) -> &'static str {
        "durations"
    }
}

pub struct TerminologyStep;

impl ProcessingStep for TerminologyStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        ctx: &PipelineContext<'_>,
        state: &mut PipelineState<'_>,
    ) -> Result<()> {
        processor::normalize_vocabularies(domain, df, ctx, &mut state.issues)
    }

    fn step_name(&self) -> &'static str {
        "terminology"
    }
}

pub struct StandardizedResultsStep;

impl ProcessingStep for StandardizedResultsStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        _ctx: &PipelineContext<'_>,
        _state: &mut PipelineState<'_>,
    ) -> Result<()> {
        processor::standardize_results(domain, df)
    }

    fn step_name(&self) -> &'static str {
        "standardized_results"
    }
}

/// Domain rules, bracketed by sequence checks.
///
/// Colliding source sequence values are recorded before the processor runs;
/// any sequence left non-dense afterwards is renumbered in row order. Study
/// days are computed again since rules may fill `--DTC` values.
pub struct DomainProcessorStep;

impl ProcessingStep for DomainProcessorStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        ctx: &PipelineContext<'_>,
        state: &mut PipelineState<'_>,
    ) -> Result<()> {
        if let Some((usubjid, seq)) = sequence_columns(domain, df) {
            let collisions = count_collisions(df, &usubjid, &seq)?;
            if collisions > 0 {
                state.issues.push(BuildIssue::new(
                    IssueKind::SequenceCollision,
                    Some(&seq),
                    collisions,
                    "source sequence values collide; regenerated".to_string(),
                ));
            }
        }
        let rules = ctx.processors().get(&domain.code);
        debug!(
            domain = domain.code.as_str(),
            processor = rules.description(),
            "running domain processor"
        );
        rules.process(domain, df, ctx)?;
        if ensure_dense_sequence(domain, df)? {
            debug!(domain = domain.code.as_str(), "sequence regenerated in row order");
        }
        processor::compute_study_days(domain, df, ctx)
    }

    fn step_name(&self) -> &'static str {
        "domain_processor"
    }
}

pub struct DropEmptyPermissibleStep;

impl ProcessingStep for DropEmptyPermissibleStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        ctx: &PipelineContext<'_>,
        _state: &mut PipelineState<'_>,
    ) -> Result<()> {
        processor::drop_empty_permissible(domain, df, &ctx.options)?;
        Ok(())
    }

    fn step_name(&self) -> &'static str {
        "drop_empty_permissible"
    }
}

pub struct ReorderStep;

impl ProcessingStep for ReorderStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        _ctx: &PipelineContext<'_>,
        _state: &mut PipelineState<'_>,
    ) -> Result<()> {
        processor::reorder_columns(domain, df)
    }

    fn step_name(&self) -> &'static str {
        "reorder"
    }
}

pub struct RequiredValuesStep;

impl ProcessingStep for RequiredValuesStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        ctx: &PipelineContext<'_>,
        _state: &mut PipelineState<'_>,
    ) -> Result<()> {
        if ctx.options.lenient {
            return Ok(());
        }
        processor::check_required_values(domain, df)
    }

    fn step_name(&self) -> &'static str {
        "required_values"
    }
}

pub struct LengthsStep;

impl ProcessingStep for LengthsStep {
    fn execute(
        &self,
        domain: &Domain,
        df: &mut DataFrame,
        _ctx: &PipelineContext<'_>,
        state: &mut PipelineState<'_>,
    ) -> Result<()> {
        processor::enforce_lengths(domain, df, &mut state.issues)
    }

    fn step_name(&self) -> &'static str {
        "lengths"
    }
}
