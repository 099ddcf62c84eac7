//! SDTMIG domain definitions loaded from `Datasets.csv` and `Variables.csv`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use sdtm_model::{CoreDesignation, DatasetClass, DatasetMetadata, Domain, Variable, VariableType};

use crate::csv_utils::{CsvRow, get_field, get_optional, read_csv_table};
use crate::error::{Result, StandardsError};

const DATASET_KEY: &str = "Dataset Name";

/// Catalog of domain definitions for one SDTMIG version.
///
/// Loaded once and shared by reference; `clear` and `reload` exist for test isolation.
#[derive(Debug, Clone, Default)]
pub struct DomainRegistry {
    source_dir: Option<PathBuf>,
    domains: BTreeMap<String, Domain>,
}

impl DomainRegistry {
    /// Load every domain defined under `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut registry = Self {
            source_dir: Some(dir.to_path_buf()),
            domains: BTreeMap::new(),
        };
        registry.reload()?;
        Ok(registry)
    }

    /// Registry over already-built domains (no backing files).
    pub fn from_domains(domains: impl IntoIterator<Item = Domain>) -> Self {
        Self {
            source_dir: None,
            domains: domains
                .into_iter()
                .map(|domain| (domain.code.clone(), domain))
                .collect(),
        }
    }

    /// Re-read the backing files, replacing the current contents.
    pub fn reload(&mut self) -> Result<()> {
        let Some(dir) = self.source_dir.clone() else {
            return Ok(());
        };
        let domains = load_domains(&dir)?;
        if domains.is_empty() {
            return Err(StandardsError::NoDomains { path: dir });
        }
        debug!(path = %dir.display(), domain_count = domains.len(), "loaded domain definitions");
        self.domains = domains
            .into_iter()
            .map(|domain| (domain.code.clone(), domain))
            .collect();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.domains.clear();
    }

    /// Domain by code (case-insensitive).
    pub fn get(&self, code: &str) -> Option<&Domain> {
        self.domains.get(&code.trim().to_uppercase())
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Domain> {
        self.domains.values()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }
}

/// Load domains from a directory holding `Datasets.csv` and `Variables.csv`.
pub fn load_domains(base_dir: &Path) -> Result<Vec<Domain>> {
    let datasets_path = base_dir.join("Datasets.csv");
    let variables_path = base_dir.join("Variables.csv");
    let (dataset_headers, datasets) = read_csv_table(&datasets_path)?;
    require_column(&datasets_path, &dataset_headers, DATASET_KEY)?;
    let (variable_headers, variables) = read_csv_table(&variables_path)?;
    for column in [DATASET_KEY, "Variable Name", "Type"] {
        require_column(&variables_path, &variable_headers, column)?;
    }
    Ok(build_domains(&datasets, &variables))
}

fn require_column(path: &Path, headers: &[String], column: &str) -> Result<()> {
    if headers.iter().any(|h| h == column) {
        Ok(())
    } else {
        Err(StandardsError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })
    }
}

fn parse_variable_type(raw: &str) -> VariableType {
    match raw.trim().to_lowercase().as_str() {
        "num" | "numeric" | "integer" | "float" => VariableType::Num,
        _ => VariableType::Char,
    }
}

fn parse_dataset_metadata(row: &CsvRow) -> Option<DatasetMetadata> {
    let name = get_field(row, DATASET_KEY).to_uppercase();
    if name.is_empty() {
        return None;
    }
    let class_name = get_optional(row, "Class");
    let dataset_class = class_name.as_deref().and_then(|raw| match raw.parse() {
        Ok(class) => Some(class),
        Err(error) => {
            warn!(dataset = %name, %error, "unrecognized dataset class");
            None
        }
    });
    Some(DatasetMetadata {
        dataset_name: name,
        class_name,
        dataset_class,
        label: get_optional(row, "Dataset Label"),
        structure: get_optional(row, "Structure"),
    })
}

fn parse_variable(dataset: &str, row: &CsvRow) -> Option<Variable> {
    let name = get_field(row, "Variable Name").to_uppercase();
    if name.is_empty() {
        return None;
    }
    let core = get_optional(row, "Core").and_then(|raw| {
        match raw.parse::<CoreDesignation>() {
            Ok(core) => Some(core),
            Err(error) => {
                warn!(dataset, variable = %name, %error, "unrecognized core designation");
                None
            }
        }
    });
    Some(Variable {
        label: get_optional(row, "Variable Label"),
        data_type: parse_variable_type(&get_field(row, "Type")),
        length: get_optional(row, "Length").and_then(|v| v.parse().ok()),
        role: get_optional(row, "Role"),
        core,
        codelist_code: get_optional(row, "CDISC CT Codelist Code(s)"),
        value_domain: get_optional(row, "Described Value Domain(s)"),
        order: get_optional(row, "Variable Order").and_then(|v| v.parse().ok()),
        name,
    })
}

fn build_domains(datasets: &[CsvRow], variables: &[CsvRow]) -> Vec<Domain> {
    let meta: BTreeMap<String, DatasetMetadata> = datasets
        .iter()
        .filter_map(parse_dataset_metadata)
        .map(|m| (m.dataset_name.clone(), m))
        .collect();

    let mut grouped: BTreeMap<String, Vec<Variable>> = BTreeMap::new();
    for row in variables {
        let dataset = get_field(row, DATASET_KEY).to_uppercase();
        if dataset.is_empty() {
            continue;
        }
        if let Some(variable) = parse_variable(&dataset, row) {
            grouped.entry(dataset).or_default().push(variable);
        }
    }

    let mut domains = Vec::new();
    for (code, mut vars) in grouped {
        // Stable: rows without an order keep file order after the ordered ones.
        vars.sort_by_key(|v| v.order.unwrap_or(u32::MAX));
        let mut domain = Domain::new(code.clone(), vars);
        if let Some(metadata) = meta.get(&code) {
            domain.description = metadata.label.clone();
            domain.label = metadata.label.clone();
            domain.class_name = metadata.class_name.clone();
            domain.dataset_class = metadata.dataset_class;
            domain.structure = metadata.structure.clone();
        } else {
            // Class may still be recorded per variable row.
            domain.dataset_class = variables
                .iter()
                .filter(|row| get_field(row, DATASET_KEY).eq_ignore_ascii_case(&code))
                .find_map(|row| get_optional(row, "Class"))
                .and_then(|raw| raw.parse::<DatasetClass>().ok());
        }
        domains.push(domain);
    }
    domains
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> CsvRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn variables_sorted_by_declared_order() {
        let datasets = vec![row(&[(DATASET_KEY, "ae"), ("Class", "Events")])];
        let variables = vec![
            row(&[(DATASET_KEY, "AE"), ("Variable Name", "AETERM"), ("Variable Order", "3")]),
            row(&[(DATASET_KEY, "AE"), ("Variable Name", "STUDYID"), ("Variable Order", "1")]),
            row(&[(DATASET_KEY, "AE"), ("Variable Name", "AESEQ"), ("Type", "Num"), ("Variable Order", "2")]),
        ];
        let domains = build_domains(&datasets, &variables);
        assert_eq!(domains.len(), 1);
        let names: Vec<&str> = domains[0].variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["STUDYID", "AESEQ", "AETERM"]);
        assert_eq!(domains[0].dataset_class, Some(DatasetClass::Events));
        assert_eq!(domains[0].variables[1].data_type, VariableType::Num);
    }

    #[test]
    fn unknown_core_is_dropped() {
        let variable = parse_variable(
            "AE",
            &row(&[("Variable Name", "aeterm"), ("Core", "Sometimes")]),
        )
        .expect("variable");
        assert_eq!(variable.name, "AETERM");
        assert!(variable.core.is_none());
    }
}
