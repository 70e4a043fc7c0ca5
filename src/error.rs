// src/error.rs - Error taxonomy for the print subsystem
use thiserror::Error;

/// Errors surfaced by capability loading, request building and job submission.
///
/// Payloads are plain strings so the error can be cloned onto events.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PrintError {
    /// The print or capabilities service could not be reached (network, timeout, HTTP status).
    #[error("Transport error: {0}")]
    Transport(String),
    /// The capabilities document was not valid JSON or was missing required entries.
    #[error("Capabilities error: {0}")]
    Capabilities(String),
    /// The print response was malformed or carried a service exception.
    #[error("Submission error: {0}")]
    Submission(String),
    /// Capabilities have not been loaded yet.
    #[error("Print capabilities not loaded")]
    NotReady,
    /// A page had neither center+scale nor bbox, or no page was given.
    #[error("Page {0} is missing or has neither center and scale nor bbox")]
    InvalidPage(usize),
    #[error("Unknown layout: {0}")]
    UnknownLayout(String),
    #[error("Unknown dpi: {0}")]
    UnknownDpi(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}
