// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatsbyHelperError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Webhook request failed: {0}")]
    Webhook(String),

    #[error("Delta store error: {0}")]
    StoreError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for GatsbyHelperError {
    fn from(err: reqwest::Error) -> Self {
        GatsbyHelperError::Webhook(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GatsbyHelperError>;
