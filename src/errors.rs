/*!
 * Error types for the xliffwai application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status into the matching provider error
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised while loading or writing an XLIFF document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document does not exist
    #[error("Document not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The document is not well-formed XML
    #[error("Malformed document: {0}")]
    Format(String),

    /// Reading or writing the document failed
    #[error("Document I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid tuning or provider parameters, detected before any provider call
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),

    #[error("Save frequency must be at least 1, got {0}")]
    InvalidSaveFrequency(usize),

    #[error("Delay between batches must be a finite, non-negative number of seconds, got {0}")]
    InvalidDelay(f64),

    #[error("A target language is required")]
    MissingTargetLanguage,

    #[error("Translation API key is required for {0} provider")]
    MissingApiKey(String),

    #[error("Invalid endpoint for {provider} provider: {endpoint}")]
    InvalidEndpoint {
        provider: String,
        endpoint: String,
    },
}

/// Failures that abort a translation run
#[derive(Error, Debug)]
pub enum EngineError {
    /// The document could not be read or is malformed
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The run was configured with invalid parameters
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The final checkpoint could not be persisted
    #[error("Failed to write checkpoint to {}: {source}", path.display())]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
}
