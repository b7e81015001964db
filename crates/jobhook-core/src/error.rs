//! Error taxonomy for configuration loading and event dispatch.

use std::path::PathBuf;

/// Errors raised while loading or compiling the rule document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("rule #{index} ({repo}): invalid {field} pattern: {source}")]
    InvalidPattern {
        index: usize,
        repo: String,
        field: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Errors that abort a dispatch.
///
/// Generic trigger failures never appear here: they are logged and the
/// dispatch carries on with the next job.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unsupported event type: {0}")]
    UnsupportedEvent(String),

    #[error("malformed {event} payload: {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rule {rule} matched but declares no jobs")]
    NoJobsConfigured { rule: String },

    #[error("job {job} was not found (matched by rule {rule})")]
    JobNotFound { job: String, rule: String },
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
