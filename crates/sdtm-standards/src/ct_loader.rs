//! Controlled Terminology package loader.
//!
//! Packages live in dated release directories:
//!
//! ```text
//! standards/ct/2024-03-29/SDTM_CT_2024-03-29.csv
//! standards/ct/2024-03-29/SEND_CT_2024-03-29.csv
//! ```
//!
//! Every `*_CT_*.csv` file in the selected release is merged into one
//! [`TerminologyRegistry`], SDTM packages first.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use sdtm_model::ct::{Codelist, Term, TerminologyCatalog, TerminologyRegistry};

use crate::csv_utils::{csv_glob, default_standards_root, get_field, get_optional, read_csv_table};
use crate::error::{Result, StandardsError};
use crate::hash::sha256_file;

/// Release loaded when no version is configured.
pub const DEFAULT_CT_VERSION: &str = "2024-03-29";

/// Load the default CT registry from `<standards root>/ct`.
pub fn load_default_ct_registry() -> Result<TerminologyRegistry> {
    load_ct_registry(&default_standards_root().join("ct"), Some(DEFAULT_CT_VERSION))
}

/// Pick the release directory to load.
///
/// Uses `version` when that directory exists, otherwise the newest dated directory.
pub fn resolve_ct_version_dir(ct_root: &Path, version: Option<&str>) -> Result<(String, PathBuf)> {
    let mut versions = available_ct_versions(ct_root)?;
    if let Some(requested) = version.map(str::trim).filter(|v| !v.is_empty()) {
        if versions.iter().any(|v| v == requested) {
            return Ok((requested.to_string(), ct_root.join(requested)));
        }
        if let Some(newest) = versions.last() {
            warn!(
                requested,
                fallback = %newest,
                "controlled terminology version not found, using newest available"
            );
        }
    }
    let newest = versions
        .pop()
        .ok_or_else(|| StandardsError::NoTerminologyVersions {
            path: ct_root.to_path_buf(),
        })?;
    let dir = ct_root.join(&newest);
    Ok((newest, dir))
}

/// Dated (`YYYY-MM-DD`) release directories under `ct_root`, oldest first.
pub fn available_ct_versions(ct_root: &Path) -> Result<Vec<String>> {
    let mut versions = Vec::new();
    if !ct_root.exists() {
        return Ok(versions);
    }
    let entries = std::fs::read_dir(ct_root).map_err(|e| StandardsError::io(ct_root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StandardsError::io(ct_root, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && is_release_date(name)
        {
            versions.push(name.to_string());
        }
    }
    versions.sort();
    Ok(versions)
}

fn is_release_date(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(idx, b)| match idx {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Load and merge every package of one release.
///
/// Malformed package files are logged and skipped.
pub fn load_ct_registry(ct_root: &Path, version: Option<&str>) -> Result<TerminologyRegistry> {
    let (resolved, dir) = resolve_ct_version_dir(ct_root, version)?;
    let mut files = csv_glob(&dir, "_CT_")?;
    files.sort_by_key(|path| {
        let name = path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("")
            .to_uppercase();
        (!name.starts_with("SDTM_"), name)
    });

    let mut registry = TerminologyRegistry::new();
    for path in files {
        match load_ct_catalog(&path) {
            Ok(catalog) => {
                debug!(
                    file = %path.display(),
                    codelist_count = catalog.codelists.len(),
                    "loaded terminology package"
                );
                registry.add_package(catalog);
            }
            Err(error) => {
                warn!(file = %path.display(), %error, "skipping malformed terminology package");
            }
        }
    }
    debug!(
        version = %resolved,
        package_count = registry.packages().len(),
        codelist_count = registry.len(),
        "terminology registry ready"
    );
    Ok(registry)
}

/// Load a single CT package file.
///
/// - Codelist rows: `Codelist Code` is blank, `Code` is the codelist NCI code
/// - Term rows: `Codelist Code` is the parent codelist code
pub fn load_ct_catalog(path: &Path) -> Result<TerminologyCatalog> {
    let (headers, rows) = read_csv_table(path)?;
    for column in ["Code", "Codelist Code"] {
        if !headers.iter().any(|h| h == column) {
            return Err(StandardsError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }
    let (label, version, publishing_set) = parse_ct_metadata(path);

    let mut catalog = TerminologyCatalog::new(label, version, publishing_set);
    catalog.source = path.file_name().and_then(|v| v.to_str()).map(String::from);
    catalog.sha256 = Some(sha256_file(path)?);

    for row in &rows {
        let code = get_field(row, "Code");
        let codelist_code = get_field(row, "Codelist Code");
        if codelist_code.is_empty() && !code.is_empty() {
            let name = get_field(row, "Codelist Name");
            let extensible =
                get_field(row, "Codelist Extensible (Yes/No)").eq_ignore_ascii_case("yes");
            catalog.add_codelist(Codelist::new(code, name, extensible));
        }
    }

    let mut orphaned = 0usize;
    for row in &rows {
        let codelist_code = get_field(row, "Codelist Code");
        let submission_value = get_field(row, "CDISC Submission Value");
        if codelist_code.is_empty() || submission_value.is_empty() {
            continue;
        }
        let term = Term {
            code: get_field(row, "Code"),
            submission_value,
            synonyms: parse_synonyms(&get_field(row, "CDISC Synonym(s)")),
            definition: get_optional(row, "CDISC Definition"),
            preferred_term: get_optional(row, "NCI Preferred Term"),
        };
        match catalog.codelists.get_mut(&codelist_code.to_uppercase()) {
            Some(codelist) => codelist.add_term(term),
            None => orphaned += 1,
        }
    }
    if orphaned > 0 {
        warn!(
            file = %path.display(),
            orphaned_terms = orphaned,
            "terms reference codelists not defined in package"
        );
    }

    Ok(catalog)
}

/// Parse CT metadata from filename (e.g., "SDTM_CT_2024-03-29.csv").
fn parse_ct_metadata(path: &Path) -> (String, Option<String>, Option<String>) {
    let stem = path.file_stem().and_then(|v| v.to_str()).unwrap_or("");

    if let Some((prefix, date)) = stem.split_once("_CT_") {
        let publishing_set = match prefix.to_uppercase().as_str() {
            "SDTM" => "SDTM".to_string(),
            "SEND" => "SEND".to_string(),
            "ADAM" => "ADaM".to_string(),
            "DEFINE-XML" | "DEFINEXML" => "DEFINE-XML".to_string(),
            "PROTOCOL" => "Protocol".to_string(),
            _ => prefix.to_string(),
        };
        let label = format!("{publishing_set} CT");
        let version = (!date.is_empty()).then(|| date.to_string());
        return (label, version, Some(publishing_set));
    }

    (stem.to_string(), None, None)
}

fn parse_synonyms(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_dates_are_recognized() {
        assert!(is_release_date("2024-03-29"));
        assert!(!is_release_date("2024-3-29"));
        assert!(!is_release_date("latest"));
    }

    #[test]
    fn metadata_from_file_name() {
        let (label, version, set) = parse_ct_metadata(Path::new("ADaM_CT_2024-03-29.csv"));
        assert_eq!(label, "ADaM CT");
        assert_eq!(version.as_deref(), Some("2024-03-29"));
        assert_eq!(set.as_deref(), Some("ADaM"));
    }

    #[test]
    fn synonyms_split_on_semicolons() {
        assert_eq!(parse_synonyms(" Female ; F ;; "), vec!["Female", "F"]);
        assert!(parse_synonyms("").is_empty());
    }
}
