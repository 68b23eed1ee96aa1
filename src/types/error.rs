//! Error types
//!
//! Configuration and pool errors stop a session before any trial is shown.
//! Recoverable conditions (dropped counterparts, best-effort ordering,
//! practice exhaustion) are reported through `ReasonCode` instead.

use thiserror::Error;

/// Catalog problems detected while building the pool
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("catalog is empty")]
    Empty,
    #[error("statement '{text}' does not start with either subject noun")]
    UnknownSubject { text: String },
    #[error("statement '{text}' appears more than once")]
    Duplicate { text: String },
    #[error("exploratory statement '{text}' has no opposite-party mirror")]
    UnpairedExploratory { text: String },
}

/// Requested set sizes the pool cannot satisfy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("cannot draw {requested} {what} from {available}")]
    Insufficient {
        what: String,
        requested: usize,
        available: usize,
    },
    #[error("statement '{text}' does not start with '{noun}'")]
    SubjectMismatch { text: String, noun: String },
    #[error("exploratory sampling enabled but the pool has no exploratory pairs")]
    NoExploratoryPairs,
}

/// Invalid study configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Table parsing failures (inverse of `to_table`)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("table header mismatch: {0}")]
    Header(String),
    #[error("row {row}: {message}")]
    Row { row: usize, message: String },
    #[error("unterminated quoted field")]
    UnterminatedQuote,
}

/// Delivery failures; never retried by the core
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("form post failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint rejected submission with status {0}")]
    Rejected(u16),
    #[error("render failed: {0}")]
    Render(#[from] std::io::Error),
}

/// Anything that can stop a session
#[derive(Debug, Error)]
pub enum StudyError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
