#![deny(unsafe_code)]

pub mod config;
pub mod csv_utils;
pub mod ct_loader;
pub mod domains;
pub mod error;
pub mod hash;

pub use crate::config::{MappingSettings, PipelineConfig, StandardsSettings};
pub use crate::csv_utils::{STANDARDS_ENV_VAR, default_standards_root};
pub use crate::ct_loader::{
    DEFAULT_CT_VERSION, available_ct_versions, load_ct_catalog, load_ct_registry,
    load_default_ct_registry, resolve_ct_version_dir,
};
pub use crate::domains::{DomainRegistry, load_domains};
pub use crate::error::StandardsError;

/// Load the SDTMIG domains shipped under the default standards root.
pub fn load_default_domain_registry() -> error::Result<DomainRegistry> {
    DomainRegistry::load(
        &default_standards_root()
            .join("sdtmig")
            .join(config::DEFAULT_SDTMIG_VERSION),
    )
}
