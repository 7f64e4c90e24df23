// src/errors.rs
use thiserror::Error;

use crate::validator::Rejection;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Analysis service responded with status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Analysis service reported an error: {0}")]
    ApiResponse(String),

    #[error("Unexpected response structure: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File rejected: {0}")]
    Validation(#[from] Rejection),
}

pub type Result<T> = std::result::Result<T, InspectError>;
