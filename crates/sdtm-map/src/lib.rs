#![deny(unsafe_code)]

//! Source column to SDTM variable mapping.

pub mod aliases;
pub mod engine;
pub mod error;
pub mod score;
pub mod utils;

pub use engine::{
    AmbiguousColumn, ConfidenceLevel, ConfidenceThresholds, MappingEngine, MappingResult,
};
pub use error::MappingError;
pub use score::{token_set, token_set_ratio};
pub use utils::{merge_mapping_configs, normalize_header, validate_mapping_config};
