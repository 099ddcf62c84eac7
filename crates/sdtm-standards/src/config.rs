#![deny(unsafe_code)]

//! Pipeline configuration file.
//!
//! ```toml
//! [standards]
//! root = "standards"
//! sdtmig_version = "v3_4"
//! ct_version = "2024-03-29"
//!
//! [mapping]
//! min_confidence = 0.5
//!
//! [build]
//! lenient = false
//!
//! [suppqual]
//! operational_min_files = 3
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sdtm_model::{DEFAULT_MIN_CONFIDENCE, ProcessingOptions, SuppqualOptions, TerminologyRegistry};

use crate::csv_utils::{STANDARDS_ENV_VAR, default_standards_root};
use crate::ct_loader::{DEFAULT_CT_VERSION, load_ct_registry};
use crate::domains::DomainRegistry;
use crate::error::{Result, StandardsError};

pub const DEFAULT_SDTMIG_VERSION: &str = "v3_4";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub standards: StandardsSettings,
    pub mapping: MappingSettings,
    pub build: ProcessingOptions,
    pub suppqual: SuppqualOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardsSettings {
    /// Standards root; `CDISC_STANDARDS_DIR` takes precedence.
    pub root: Option<PathBuf>,
    pub sdtmig_version: String,
    pub ct_version: Option<String>,
}

impl Default for StandardsSettings {
    fn default() -> Self {
        Self {
            root: None,
            sdtmig_version: DEFAULT_SDTMIG_VERSION.to_string(),
            ct_version: Some(DEFAULT_CT_VERSION.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    pub min_confidence: f32,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|e| StandardsError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
        Self::from_toml_str(&contents, path)
    }

    /// Effective standards root: environment override, then the file, then the default.
    pub fn standards_root(&self) -> PathBuf {
        if std::env::var(STANDARDS_ENV_VAR).is_ok_and(|v| !v.trim().is_empty()) {
            return default_standards_root();
        }
        self.standards
            .root
            .clone()
            .unwrap_or_else(default_standards_root)
    }

    pub fn sdtmig_dir(&self) -> PathBuf {
        self.standards_root()
            .join("sdtmig")
            .join(&self.standards.sdtmig_version)
    }

    pub fn load_domains(&self) -> Result<DomainRegistry> {
        DomainRegistry::load(&self.sdtmig_dir())
    }

    pub fn load_terminology(&self) -> Result<TerminologyRegistry> {
        load_ct_registry(
            &self.standards_root().join("ct"),
            self.standards.ct_version.as_deref(),
        )
    }
}
