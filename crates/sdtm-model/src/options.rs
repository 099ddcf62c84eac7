//! Configuration options for canonical record building.

use serde::{Deserialize, Serialize};

/// Variables kept even when every value is empty. `--` stands for the domain prefix.
pub const DEFAULT_KEEP_VARIABLES: &[&str] = &["EPOCH", "VISIT", "VISITNUM", "--DY"];

/// Default minimum confidence for accepting a fuzzy mapping.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Options controlling a single build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    /// Skip the required-value check (exploratory or partial output).
    pub lenient: bool,

    /// Permissible variables retained even when wholly empty.
    pub keep_variables: Vec<String>,

    /// Written in place of a duration that cannot be parsed.
    pub duration_placeholder: String,

    /// Log a warning for each variable whose values were rewritten.
    pub warn_on_rewrite: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            lenient: false,
            keep_variables: DEFAULT_KEEP_VARIABLES
                .iter()
                .map(ToString::to_string)
                .collect(),
            duration_placeholder: String::new(),
            warn_on_rewrite: true,
        }
    }
}

impl ProcessingOptions {
    /// Options for exploratory output: required-value failures are not raised.
    pub fn lenient() -> Self {
        Self {
            lenient: true,
            ..Self::default()
        }
    }

    /// True when `variable` is on the keep-list for `domain_code`.
    pub fn keeps(&self, domain_code: &str, variable: &str) -> bool {
        self.keep_variables.iter().any(|keep| {
            match keep.strip_prefix("--") {
                Some(suffix) => variable.eq_ignore_ascii_case(&format!("{domain_code}{suffix}")),
                None => variable.eq_ignore_ascii_case(keep),
            }
        })
    }
}

/// Options for supplemental qualifier extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppqualOptions {
    /// Lower bound on the number of other files a column must recur in to be operational.
    pub operational_min_files: usize,
    /// Share of the study's input files a column must recur in to be operational.
    pub operational_ratio: f64,
    pub qval_max_length: usize,
    pub qlabel_max_length: usize,
    /// Provenance tag written to QORIG.
    pub qorig: String,
}

impl Default for SuppqualOptions {
    fn default() -> Self {
        Self {
            operational_min_files: 3,
            operational_ratio: 0.5,
            qval_max_length: 200,
            qlabel_max_length: 40,
            qorig: "CRF".to_string(),
        }
    }
}

impl SuppqualOptions {
    /// `max(min_files, floor(total_files * ratio))`.
    pub fn operational_threshold(&self, total_files: usize) -> usize {
        let share = (total_files as f64 * self.operational_ratio).floor() as usize;
        self.operational_min_files.max(share)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_uses_floor_of_share() {
        let options = SuppqualOptions::default();
        assert_eq!(options.operational_threshold(5), 3);
        assert_eq!(options.operational_threshold(10), 5);
        assert_eq!(options.operational_threshold(0), 3);
    }

    #[test]
    fn keep_list_expands_domain_prefix() {
        let options = ProcessingOptions::default();
        assert!(options.keeps("AE", "AEDY"));
        assert!(options.keeps("AE", "epoch"));
        assert!(!options.keeps("AE", "AESTDY"));
    }
}
