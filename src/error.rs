//! Error types for the ACX SDK

use thiserror::Error;

/// Main error type for the SDK
#[derive(Error, Debug, Clone)]
pub enum SdkError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Exchange error: {0}")]
    Exchange(String),
}

/// Connection-specific errors
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    #[error("Failed to establish connection: {0}")]
    EstablishmentFailed(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Timeout occurred: {0}")]
    Timeout(String),

    #[error("Connection shut down")]
    ShutDown,
}

/// Parsing-specific errors
#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid data type: {0}")]
    InvalidDataType(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}
