use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown dataset class: {0}")]
    UnknownDatasetClass(String),
    #[error("unknown core designation: {0}")]
    UnknownCoreDesignation(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
