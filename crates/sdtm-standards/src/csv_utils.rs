//! Shared CSV utilities for loading standards files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;

use crate::error::{Result, StandardsError};

/// Environment variable for overriding the standards directory.
pub const STANDARDS_ENV_VAR: &str = "CDISC_STANDARDS_DIR";

/// Get the default standards root directory.
///
/// Checks the `CDISC_STANDARDS_DIR` environment variable first,
/// then falls back to the `standards/` directory at the workspace root.
pub fn default_standards_root() -> PathBuf {
    if let Ok(root) = std::env::var(STANDARDS_ENV_VAR)
        && !root.trim().is_empty()
    {
        return PathBuf::from(root);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../standards")
}

pub type CsvRow = BTreeMap<String, String>;

/// Read a CSV file into its header names and row maps.
///
/// Strips BOM characters from headers and trims whitespace from values.
pub fn read_csv_table(path: &Path) -> Result<(Vec<String>, Vec<CsvRow>)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| StandardsError::csv(path, &e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| StandardsError::csv(path, &e))?
        .iter()
        .map(|h| h.trim_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| StandardsError::csv(path, &e))?;
        let mut row = BTreeMap::new();
        for (idx, value) in record.iter().enumerate() {
            let Some(key) = headers.get(idx) else {
                continue;
            };
            row.insert(key.clone(), value.trim().to_string());
        }
        rows.push(row);
    }
    Ok((headers, rows))
}

/// Read a CSV file into a vector of row maps.
pub fn read_csv_rows(path: &Path) -> Result<Vec<CsvRow>> {
    read_csv_table(path).map(|(_, rows)| rows)
}

/// Get a field value from a row, returning empty string if not present.
pub fn get_field(row: &CsvRow, key: &str) -> String {
    row.get(key).cloned().unwrap_or_default()
}

/// Get an optional field value from a row (None if empty or missing).
pub fn get_optional(row: &CsvRow, key: &str) -> Option<String> {
    row.get(key).filter(|v| !v.is_empty()).cloned()
}

/// CSV files in `dir` whose name contains `pattern`, sorted by name.
pub fn csv_glob(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    if !dir.exists() {
        return Ok(matches);
    }
    let entries = std::fs::read_dir(dir).map_err(|e| StandardsError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StandardsError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|v| v.to_str()).unwrap_or("");
        if name.contains(pattern) && name.to_ascii_lowercase().ends_with(".csv") {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches)
}
