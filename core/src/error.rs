use crate::types::{Age, Gender};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A cohort that must have income reference data has none.
    /// This is a data-integrity fault in the supplied tables.
    #[error("No income reference row for age {age}, gender {gender}")]
    MissingReference { age: Age, gender: Gender },

    #[error("Invalid reference data: {0}")]
    InvalidReference(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
