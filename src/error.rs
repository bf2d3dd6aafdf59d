use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input structure: {0}")]
    InputStructure(String),

    #[error("Classification request failed: {0}")]
    Transport(String),

    #[error("Failed to parse classification payload: {0}")]
    PayloadParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to access document {}: {message}", .path.display())]
    Document { path: PathBuf, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Only structural problems with the input abort a run; everything else
    /// is absorbed into per-entry fallbacks.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InputStructure(_))
    }
}
