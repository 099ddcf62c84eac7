use std::fmt;

use thiserror::Error;

/// Missing-value count for one required variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingValues {
    pub variable: String,
    pub count: usize,
}

impl fmt::Display for MissingValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} missing)", self.variable, self.count)
    }
}

/// Fatal build failures. Travels inside `anyhow::Error`; recover with `downcast_ref`.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{domain}: required variables have missing values: {}", join(.variables))]
    RequiredValueMissing {
        domain: String,
        variables: Vec<MissingValues>,
    },

    #[error("{domain}: source column {column} mapped to {variable} is not in the source table")]
    MissingSourceColumn {
        domain: String,
        column: String,
        variable: String,
    },
}

impl BuildError {
    /// Variables reported as missing, empty for other kinds.
    pub fn missing_variables(&self) -> Vec<&str> {
        match self {
            Self::RequiredValueMissing { variables, .. } => {
                variables.iter().map(|v| v.variable.as_str()).collect()
            }
            Self::MissingSourceColumn { .. } => Vec::new(),
        }
    }
}

fn join(variables: &[MissingValues]) -> String {
    variables
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
