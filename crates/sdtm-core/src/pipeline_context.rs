//! Shared, read-only inputs for a domain build.
//!
//! The [`PipelineContext`] bundles what every step and processor may consult:
//!
//! - **Study id**: fallback for `STUDYID` when the mapping configuration has none
//! - **Terminology**: the loaded [`TerminologyRegistry`]
//! - **Study metadata**: study codelists used to decode code columns
//! - **Reference starts**: `RFSTDTC` by `USUBJID` for study day derivation
//! - **Options**: build and supplemental qualifier options
//! - **Processors**: the domain processor registry
//!
//! Registries are borrowed, so one loaded registry serves any number of builds.

use std::collections::BTreeMap;

use sdtm_model::{
    Codelist, Domain, ProcessingOptions, StudyMetadata, SuppqualOptions, TerminologyRegistry,
};

use crate::domain_processors::{ProcessorRegistry, default_registry};

pub struct PipelineContext<'a> {
    /// Study identifier (e.g., "CDISC01").
    pub study_id: String,
    pub terminology: Option<&'a TerminologyRegistry>,
    pub study_metadata: Option<&'a StudyMetadata>,
    /// Reference start dates (RFSTDTC) by USUBJID.
    pub reference_starts: BTreeMap<String, String>,
    pub options: ProcessingOptions,
    pub suppqual: SuppqualOptions,
    processors: Option<&'a ProcessorRegistry>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(study_id: impl Into<String>) -> Self {
        Self {
            study_id: study_id.into(),
            terminology: None,
            study_metadata: None,
            reference_starts: BTreeMap::new(),
            options: ProcessingOptions::default(),
            suppqual: SuppqualOptions::default(),
            processors: None,
        }
    }

    pub fn with_terminology(mut self, terminology: &'a TerminologyRegistry) -> Self {
        self.terminology = Some(terminology);
        self
    }

    pub fn with_study_metadata(mut self, metadata: &'a StudyMetadata) -> Self {
        self.study_metadata = Some(metadata);
        self
    }

    pub fn with_reference_starts(mut self, starts: BTreeMap<String, String>) -> Self {
        self.reference_starts = starts;
        self
    }

    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_suppqual_options(mut self, options: SuppqualOptions) -> Self {
        self.suppqual = options;
        self
    }

    /// Use a custom processor registry instead of the built-in one.
    pub fn with_processors(mut self, processors: &'a ProcessorRegistry) -> Self {
        self.processors = Some(processors);
        self
    }

    /// Adds reference start dates; existing entries win.
    pub fn add_reference_starts(&mut self, starts: BTreeMap<String, String>) {
        for (usubjid, rfstdtc) in starts {
            self.reference_starts.entry(usubjid).or_insert(rfstdtc);
        }
    }

    pub fn processors(&self) -> &ProcessorRegistry {
        match self.processors {
            Some(processors) => processors,
            None => default_registry(),
        }
    }

    /// Codelists bound to a domain variable, in declared order. Unknown codes are skipped.
    pub fn resolve_ct(&self, domain: &Domain, variable: &str) -> Vec<&'a Codelist> {
        let Some(registry) = self.terminology else {
            return Vec::new();
        };
        let Some(variable) = domain.variable(variable) else {
            return Vec::new();
        };
        variable
            .codelist_codes()
            .iter()
            .filter_map(|code| registry.lookup(code))
            .collect()
    }
}

impl Default for PipelineContext<'_> {
    fn default() -> Self {
        Self::new("")
    }
}
