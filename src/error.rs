use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};

/// Errors that stop a scan before or during its run.
///
/// Per-candidate DNS and HTTP failures are never reported here; they are
/// captured in the returned results instead.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, ScanError::Configuration(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ScanError::Validation(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown mode `{0}` (expected low, mid, high or test)")]
    UnknownMode(String),

    #[error("cannot read wordlist {}: {source}", .path.display())]
    WordlistUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to initialise DNS resolver: {0}")]
    Resolver(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("`{0}` is not a valid domain (e.g.: example.com)")]
    InvalidDomain(String),

    #[error("concurrency must be between {} and {}, got {0}", MIN_CONCURRENCY, MAX_CONCURRENCY)]
    ConcurrencyOutOfRange(usize),

    #[error("concurrency must be a number, got `{0}`")]
    ConcurrencyNotNumeric(String),
}

/// Why a scheduled item produced no worker output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    #[error("cancelled before completion")]
    Cancelled,

    #[error("worker panicked: {0}")]
    Panicked(String),
}

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;
