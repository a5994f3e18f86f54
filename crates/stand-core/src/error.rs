//! Error types for stand runs

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for run operations
pub type Result<T> = std::result::Result<T, StandError>;

/// Failure to obtain a single metric reading.
///
/// Never fatal: the gatherer records it as a failed sample and the batch
/// counts as a breach.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Transport-level failure talking to the backend
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend answered with an error status
    #[error("backend error: {0}")]
    Backend(String),

    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Query matched no series
    #[error("query returned no data")]
    NoData,

    /// Query matched more than one series
    #[error("ambiguous result: {0} series matched")]
    Ambiguous(usize),

    /// Result type the runner cannot reduce to one number
    #[error("unsupported result type: {0}")]
    UnsupportedResultType(String),
}

/// Environment lifecycle failure. Always fatal to the run.
#[derive(Error, Debug)]
pub enum EnvError {
    /// The lifecycle command could not be spawned
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The lifecycle command exited unsuccessfully
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// Lifecycle transition requested from the wrong state
    #[error("environment already {0}")]
    InvalidTransition(&'static str),
}

/// Configuration could not be read or is not usable.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the expected shape
    #[error("cannot parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Config parsed but violates a constraint
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error for a run
#[derive(Error, Debug)]
pub enum StandError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
