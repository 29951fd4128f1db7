//! Daemon error type

use thiserror::Error;

/// Errors raised by the daemon's collaborators
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Backend or energy meter request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serial display port errors
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Appliance I/O errors
    #[error("Hardware error: {0}")]
    Hardware(String),
}

/// Convenience Result type using the daemon Error
pub type Result<T> = std::result::Result<T, Error>;
