//! Error types for the itbooks application.
//!
//! Uses `thiserror` for structured error definitions that provide
//! clear context about what went wrong.

use thiserror::Error;

/// Error type for crawling a publisher site.
#[derive(Error, Debug)]
pub enum ScraperError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    BadStatus { url: String, status: u16 },

    /// URL parsing or validation failed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Fixture or page not available
    #[error("Not found: {0}")]
    NotFound(String),

    /// The crawl was cancelled by the caller
    #[error("Crawl cancelled")]
    Cancelled,

    /// The consumer of the book stream went away
    #[error("Book stream closed by consumer")]
    StreamClosed,
}

impl From<url::ParseError> for ScraperError {
    fn from(err: url::ParseError) -> Self {
        ScraperError::InvalidUrl(err.to_string())
    }
}

/// Error type for the book store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to read or write the store file
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Store file contains invalid JSON
    #[error("Failed to parse store: {0}")]
    Parse(#[from] serde_json::Error),

    /// Book has no ISBN to key on
    #[error("Book has no ISBN: {0}")]
    MissingIsbn(String),
}

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config directory not found
    #[error("Could not determine {0} directory")]
    NoDir(&'static str),
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_parse_error_converts() {
        let err: ScraperError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, ScraperError::InvalidUrl(_)));
    }
}
