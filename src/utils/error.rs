//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.
//!
//! Parsing never fails: unrecognized traceback lines are skipped. The only
//! batch-fatal condition is a structurally broken span forest.

use thiserror::Error;

/// Structural problems found while linking spans into a forest.
///
/// Any of these aborts processing of the whole batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForestError {
    #[error("Span hierarchy too deep at span {span_id}: depth exceeds {max_depth}")]
    DepthExceeded { span_id: String, max_depth: usize },

    #[error("Span {span_id} appears more than once in the batch")]
    DuplicateSpan { span_id: String },

    #[error("Parent linkage of span {span_id} loops back on itself")]
    CyclicLinkage { span_id: String },
}

/// Errors decoding a serialized side-channel map
#[derive(Error, Debug)]
pub enum FrameInfoError {
    #[error("Side-channel JSON is invalid: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors loading settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[from] std::io::Error),

    #[error("Config TOML parse error: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur during file input/output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
