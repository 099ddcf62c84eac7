//! Domain processor trait and registry.
//!
//! The [`DomainProcessor`] trait is the seam for domain-specific rules. The
//! [`ProcessorRegistry`] looks processors up by domain code and falls back to
//! an explicit no-op [`DefaultProcessor`] for codes without one.
//!
//! ```ignore
//! use sdtm_core::domain_processors::default_registry;
//!
//! let processor = default_registry().get("DM");
//! processor.process(&domain, &mut df, &context)?;
//! ```

use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::Result;
use polars::prelude::DataFrame;
use sdtm_model::Domain;

use crate::pipeline_context::PipelineContext;

use super::{ae, cm, dm, ds, ex, lb, mh, vs};

/// Domain-specific rules applied after the generic normalization steps.
///
/// Implementations must be idempotent when re-run on their own output and must
/// not rely on incoming row order: anything order-dependent sorts first.
pub trait DomainProcessor: Send + Sync {
    /// Upper-case domain code handled by this processor (e.g. "DM").
    fn domain_code(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "Domain processor"
    }

    /// Apply the domain rules to `df` in place.
    ///
    /// # Errors
    ///
    /// Returns an error when a DataFrame operation fails.
    fn process(&self, domain: &Domain, df: &mut DataFrame, context: &PipelineContext)
    -> Result<()>;
}

/// Registry of domain processors indexed by domain code.
pub struct ProcessorRegistry {
    processors: BTreeMap<&'static str, Box<dyn DomainProcessor>>,
    default_processor: Box<dyn DomainProcessor>,
}

impl ProcessorRegistry {
    pub fn new(default_processor: Box<dyn DomainProcessor>) -> Self {
        Self {
            processors: BTreeMap::new(),
            default_processor,
        }
    }

    /// Registry holding every built-in processor.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new(Box::new(DefaultProcessor));
        registry.register(Box::new(dm::DmProcessor));
        registry.register(Box::new(ae::AeProcessor));
        registry.register(Box::new(cm::CmProcessor));
        registry.register(Box::new(ex::ExProcessor));
        registry.register(Box::new(mh::MhProcessor));
        registry.register(Box::new(ds::DsProcessor));
        registry.register(Box::new(vs::VsProcessor));
        registry.register(Box::new(lb::LbProcessor));
        registry
    }

    /// Registers a processor for its domain code, replacing any existing one.
    pub fn register(&mut self, processor: Box<dyn DomainProcessor>) {
        self.processors.insert(processor.domain_code(), processor);
    }

    /// Processor for a domain code (case-insensitive), else the default.
    pub fn get(&self, domain_code: &str) -> &dyn DomainProcessor {
        let code = domain_code.trim().to_uppercase();
        match self.processors.get(code.as_str()) {
            Some(processor) => processor.as_ref(),
            None => self.default_processor.as_ref(),
        }
    }

    pub fn contains(&self, domain_code: &str) -> bool {
        self.processors
            .contains_key(domain_code.trim().to_uppercase().as_str())
    }

    /// Number of registered processors, excluding the default.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Registered domain codes in sorted order.
    pub fn domain_codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.processors.keys().copied()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// No-op processor for domains without bespoke rules.
pub struct DefaultProcessor;

impl DomainProcessor for DefaultProcessor {
    fn domain_code(&self) -> &'static str {
        "*"
    }

    fn description(&self) -> &'static str {
        "No domain-specific rules"
    }

    fn process(
        &self,
        _domain: &Domain,
        _df: &mut DataFrame,
        _context: &PipelineContext,
    ) -> Result<()> {
        Ok(())
    }
}

static DEFAULT_REGISTRY: OnceLock<ProcessorRegistry> = OnceLock::new();

/// Shared registry of the built-in processors, built on first use.
pub fn default_registry() -> &'static ProcessorRegistry {
    DEFAULT_REGISTRY.get_or_init(ProcessorRegistry::with_builtin)
}
