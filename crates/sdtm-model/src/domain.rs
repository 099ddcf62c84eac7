use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Default maximum length for character variables without a declared length.
///
/// Matches the SAS transport v5 limit for character values.
pub const DEFAULT_CHAR_LENGTH: u32 = 200;

/// Dataset class per SDTMIG v3.4 Chapter 2 (Fundamentals of the SDTM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetClass {
    /// Interventions: AG, CM, EC, EX, ML, PR, SU
    Interventions,
    /// Events: AE, BE, CE, DS, DV, HO, MH
    Events,
    /// Findings: DA, EG, IE, LB, PE, QS, VS, ...
    Findings,
    /// Findings About (subclass of Findings): FA, SR
    FindingsAbout,
    /// Special-Purpose: CO, DM, SE, SM, SV
    SpecialPurpose,
    /// Trial Design: TA, TD, TE, TI, TM, TS, TV
    TrialDesign,
    /// Study Reference: OI
    StudyReference,
    /// Relationship: RELREC, RELSPEC, RELSUB, SUPPQUAL
    Relationship,
}

impl DatasetClass {
    /// Returns true for the general observation classes.
    pub fn is_general_observation(&self) -> bool {
        matches!(
            self,
            DatasetClass::Interventions
                | DatasetClass::Events
                | DatasetClass::Findings
                | DatasetClass::FindingsAbout
        )
    }

    /// Returns true for Findings and Findings About.
    pub fn is_findings(&self) -> bool {
        matches!(self, DatasetClass::Findings | DatasetClass::FindingsAbout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetClass::Interventions => "Interventions",
            DatasetClass::Events => "Events",
            DatasetClass::Findings => "Findings",
            DatasetClass::FindingsAbout => "Findings About",
            DatasetClass::SpecialPurpose => "Special-Purpose",
            DatasetClass::TrialDesign => "Trial Design",
            DatasetClass::StudyReference => "Study Reference",
            DatasetClass::Relationship => "Relationship",
        }
    }
}

impl fmt::Display for DatasetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DatasetClass {
    type Err = ModelError;

    /// Handles the spellings found in standards files (case-insensitive, with/without hyphens).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', " ");
        match normalized.as_str() {
            "INTERVENTIONS" => Ok(DatasetClass::Interventions),
            "EVENTS" => Ok(DatasetClass::Events),
            "FINDINGS" => Ok(DatasetClass::Findings),
            "FINDINGS ABOUT" => Ok(DatasetClass::FindingsAbout),
            "SPECIAL PURPOSE" => Ok(DatasetClass::SpecialPurpose),
            "TRIAL DESIGN" => Ok(DatasetClass::TrialDesign),
            "STUDY REFERENCE" => Ok(DatasetClass::StudyReference),
            "RELATIONSHIP" => Ok(DatasetClass::Relationship),
            _ => Err(ModelError::UnknownDatasetClass(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Char,
    Num,
}

/// Core designation of a variable (SDTMIG Section 4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CoreDesignation {
    /// Must be present and populated on every record.
    Required,
    /// Must be present; may be null when not collected.
    Expected,
    /// Included only when collected.
    Permissible,
}

impl CoreDesignation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoreDesignation::Required => "Req",
            CoreDesignation::Expected => "Exp",
            CoreDesignation::Permissible => "Perm",
        }
    }
}

impl FromStr for CoreDesignation {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REQ" | "REQUIRED" => Ok(CoreDesignation::Required),
            "EXP" | "EXPECTED" => Ok(CoreDesignation::Expected),
            "PERM" | "PERMISSIBLE" => Ok(CoreDesignation::Permissible),
            _ => Err(ModelError::UnknownCoreDesignation(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub label: Option<String>,
    pub data_type: VariableType,
    pub length: Option<u32>,
    pub role: Option<String>,
    pub core: Option<CoreDesignation>,
    pub codelist_code: Option<String>,
    /// Described value domain from the standards file (e.g. "ISO 8601 datetime or interval").
    #[serde(default)]
    pub value_domain: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

impl Variable {
    pub fn new(name: impl Into<String>, data_type: VariableType) -> Self {
        Self {
            name: name.into(),
            label: None,
            data_type,
            length: None,
            role: None,
            core: None,
            codelist_code: None,
            value_domain: None,
            order: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_core(mut self, core: CoreDesignation) -> Self {
        self.core = Some(core);
        self
    }

    pub fn with_codelist(mut self, code: impl Into<String>) -> Self {
        self.codelist_code = Some(code.into());
        self
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn is_char(&self) -> bool {
        self.data_type == VariableType::Char
    }

    pub fn is_required(&self) -> bool {
        self.core == Some(CoreDesignation::Required)
    }

    pub fn is_permissible(&self) -> bool {
        self.core == Some(CoreDesignation::Permissible)
    }

    /// Date or datetime variables: `--DTC` names or an ISO 8601 datetime value domain.
    pub fn is_date_like(&self) -> bool {
        if !self.is_char() {
            return false;
        }
        if ends_with_case_insensitive(&self.name, "DTC") {
            return true;
        }
        self.value_domain.as_deref().is_some_and(|domain| {
            let upper = domain.to_uppercase();
            upper.contains("ISO 8601") && (upper.contains("DATE") || upper.contains("TIME"))
        })
    }

    /// Duration variables: `--DUR` names or an ISO 8601 duration value domain.
    pub fn is_duration_like(&self) -> bool {
        if !self.is_char() {
            return false;
        }
        if ends_with_case_insensitive(&self.name, "DUR") {
            return true;
        }
        self.value_domain
            .as_deref()
            .is_some_and(|domain| domain.to_uppercase().contains("ISO 8601 DURATION"))
    }

    /// Codelist codes referenced by this variable, in declared order.
    pub fn codelist_codes(&self) -> Vec<String> {
        let Some(raw) = self.codelist_code.as_deref() else {
            return Vec::new();
        };
        raw.split([';', ','])
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    }

    /// Maximum character length, falling back to [`DEFAULT_CHAR_LENGTH`].
    pub fn max_length(&self) -> u32 {
        self.length.unwrap_or(DEFAULT_CHAR_LENGTH)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub code: String,
    pub description: Option<String>,
    /// The raw class name from standards (e.g., "Findings", "Special-Purpose")
    pub class_name: Option<String>,
    #[serde(default)]
    pub dataset_class: Option<DatasetClass>,
    pub label: Option<String>,
    pub structure: Option<String>,
    pub dataset_name: Option<String>,
    /// Variables in declared order.
    pub variables: Vec<Variable>,
}

impl Domain {
    pub fn new(code: impl Into<String>, variables: Vec<Variable>) -> Self {
        let code = code.into().to_uppercase();
        Self {
            dataset_name: Some(code.clone()),
            code,
            description: None,
            class_name: None,
            dataset_class: None,
            label: None,
            structure: None,
            variables,
        }
    }

    pub fn with_class(mut self, class: DatasetClass) -> Self {
        self.class_name = Some(class.as_str().to_string());
        self.dataset_class = Some(class);
        self
    }

    pub fn is_general_observation(&self) -> bool {
        self.dataset_class
            .map(|c| c.is_general_observation())
            .unwrap_or(false)
    }

    pub fn is_findings(&self) -> bool {
        self.dataset_class.is_some_and(|c| c.is_findings())
    }

    /// Return the variable name that matches a canonical SDTM name (case-insensitive).
    ///
    /// A leading `--` is replaced by the domain code, so `--SEQ` resolves to `AESEQ`.
    pub fn column_name(&self, canonical: &str) -> Option<&str> {
        self.variable(canonical).map(|variable| variable.name.as_str())
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        let resolved = match name.strip_prefix("--") {
            Some(suffix) => format!("{}{}", self.code, suffix),
            None => name.to_string(),
        };
        self.variables
            .iter()
            .find(|variable| variable.name.eq_ignore_ascii_case(&resolved))
    }

    pub fn required_variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|variable| variable.is_required())
    }

    /// Infer the sequence variable for this domain using SDTM naming rules.
    /// Per SDTMIG v3.4 Section 4.1.7, domain-prefixed variables use DOMAIN as the prefix.
    pub fn infer_seq_column(&self) -> Option<&str> {
        let expected = format!("{}SEQ", self.code);
        if let Some(variable) = self
            .variables
            .iter()
            .find(|var| var.name.eq_ignore_ascii_case(&expected))
        {
            return Some(variable.name.as_str());
        }
        let mut candidates: Vec<&str> = self
            .variables
            .iter()
            .map(|var| var.name.as_str())
            .filter(|name| {
                ends_with_case_insensitive(name, "SEQ") && !name.eq_ignore_ascii_case("SEQ")
            })
            .collect();
        candidates.sort_by_key(|name| name.to_ascii_uppercase());
        if let Some(name) = candidates.first() {
            return Some(*name);
        }
        let mut grp_candidates: Vec<&str> = self
            .variables
            .iter()
            .map(|var| var.name.as_str())
            .filter(|name| {
                ends_with_case_insensitive(name, "GRPID") && !name.eq_ignore_ascii_case("GRPID")
            })
            .collect();
        grp_candidates.sort_by_key(|name| name.to_ascii_uppercase());
        grp_candidates.first().copied()
    }

    /// Strip the domain prefix from a variable name (`AESEV` -> `SEV`).
    pub fn variable_suffix<'a>(&self, name: &'a str) -> Option<&'a str> {
        let prefix = name.get(..self.code.len())?;
        if name.len() > self.code.len() && prefix.eq_ignore_ascii_case(&self.code) {
            name.get(self.code.len()..)
        } else {
            None
        }
    }
}

pub(crate) fn ends_with_case_insensitive(value: &str, suffix: &str) -> bool {
    if value.len() < suffix.len() {
        return false;
    }
    value
        .get(value.len() - suffix.len()..)
        .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub dataset_name: String,
    pub class_name: Option<String>,
    pub dataset_class: Option<DatasetClass>,
    pub label: Option<String>,
    pub structure: Option<String>,
}
