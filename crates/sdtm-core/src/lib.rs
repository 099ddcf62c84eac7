#![deny(unsafe_code)]

//! Canonical record building for SDTM domains.
//!
//! [`build_domain_frame`] runs a source table through the fixed
//! [`DomainPipeline`] under a [`MappingConfig`](sdtm_model::MappingConfig);
//! [`extract_suppqual`] turns leftover source columns into side records.

pub mod data_utils;
pub mod datetime;
pub mod domain_processors;
pub mod duration;
pub mod error;
pub mod frame;
pub mod frame_builder;
pub mod frame_utils;
pub mod pipeline;
pub mod pipeline_context;
pub mod processor;
pub mod sequence;
pub mod suppqual;

pub use datetime::{
    DateTimePrecision, calculate_study_day, compare_iso8601, end_before_start, normalize_datetime,
    parse_date,
};
pub use domain_processors::{DefaultProcessor, DomainProcessor, ProcessorRegistry, default_registry};
pub use duration::{is_iso_duration, normalize_duration};
pub use error::{BuildError, MissingValues};
pub use frame::DomainFrame;
pub use frame_builder::{MappedDomainFrame, build_domain_frame, build_mapped_domain_frame, column_hints};
pub use frame_utils::LINEAGE_COLUMN;
pub use pipeline::{DomainPipeline, PipelineState, ProcessingStep};
pub use pipeline_context::PipelineContext;
pub use suppqual::{
    OperationalColumns, SuppqualResult, extract_suppqual, sanitize_qnam, suppqual_domain_code,
};
