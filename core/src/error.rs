//! Error types for basediff

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BasediffError>;

#[derive(Error, Debug)]
pub enum BasediffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Please select all required columns (missing: {})", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Field '{field_id}' not found in table '{table_id}'")]
    FieldNotFound { table_id: String, field_id: String },

    #[error("Field '{field}' has type {field_type}; diff output needs a Text or MultiSelect field")]
    InvalidDestination { field: String, field_type: String },

    #[error("Host store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Batch {batch} of {total} failed ({committed} records already committed): {source}")]
    BatchWrite {
        batch: usize,
        total: usize,
        committed: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl BasediffError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for failures raised before any host call was made
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
