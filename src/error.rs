//! Error types for the shellgate library

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GateError>;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid secret encoding: {0}")]
    Secret(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Home directory not found")]
    NoHome,
}
