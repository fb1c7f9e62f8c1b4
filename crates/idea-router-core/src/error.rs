//! Error taxonomy for the routing pipeline.
//!
//! Each pipeline step has its own error kind. Only [`InputError`] changes what
//! the user sees; the others are absorbed and logged at the router boundary.

use thiserror::Error;

/// The inbound message cannot be processed at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Message text is empty or only whitespace.
    #[error("message has no usable text")]
    EmptyText,

    /// Message kind the bot does not handle (photo, sticker, ...).
    #[error("unsupported message kind: {0}")]
    UnsupportedKind(String),
}

/// Remote summarization failed.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// No API key configured for the completion service.
    #[error("completion API key not set")]
    NoApiKey,

    /// Request could not be sent or did not finish in time.
    #[error("completion request failed: {0}")]
    RequestFailed(String),

    /// Service answered with a non-success status.
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected shape.
    #[error("failed to parse completion response: {0}")]
    ParseError(String),

    /// Response had no text content.
    #[error("completion response contained no text")]
    EmptyContent,
}

/// A spreadsheet or task-tracker submission failed.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink is not configured.
    #[error("{0} endpoint not configured")]
    NotConfigured(&'static str),

    /// Request could not be sent or timed out.
    #[error("{sink} request failed: {message}")]
    RequestFailed { sink: &'static str, message: String },

    /// Sink answered with something other than 200.
    #[error("{sink} returned {status}: {body}")]
    Status {
        sink: &'static str,
        status: u16,
        body: String,
    },

    /// Sink answered 200 with an unreadable body.
    #[error("{sink} returned an unreadable body: {message}")]
    ParseError { sink: &'static str, message: String },
}

/// Delivering a reply to the user failed.
#[derive(Debug, Error)]
#[error("reply delivery failed: {0}")]
pub struct TransportError(pub String);

/// Startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is missing or empty.
    #[error("{0} not set. Add it to the environment or .env.local")]
    Missing(&'static str),

    /// A variable has a value that cannot be parsed.
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    /// Classifier rules file could not be read.
    #[error("failed to read classifier rules: {0}")]
    Io(#[from] std::io::Error),

    /// Classifier rules file is not valid JSON.
    #[error("failed to parse classifier rules: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Result type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;
