//! Error types for E2E scenarios

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Context setup failed: {0}")]
    Setup(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timeout after {} ms waiting for: {what}", .timeout.as_millis())]
    ElementTimeout { what: String, timeout: Duration },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Score not available: no {0} score was recorded in this scenario")]
    ScoreNotAvailable(String),

    #[error("Metric not available: no {0} measurement was recorded in this scenario")]
    MetricNotAvailable(String),

    #[error("Invalid URL pattern {0}")]
    InvalidPattern(String),

    #[error("Audit failed: {0}")]
    Audit(String),

    #[error("Execution context is {0}")]
    InvalidState(&'static str),

    #[error("Playwright bridge error: {0}")]
    Bridge(String),

    #[error("Node.js not found. Install Node.js and run: npm install playwright lighthouse")]
    NodeNotFound,

    #[error("Target {url} not reachable after {attempts} attempts")]
    Preflight { url: String, attempts: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Whether this error came from a wait that ran out of budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, E2eError::ElementTimeout { .. })
    }
}

/// Missing or malformed environment configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("default environment '{name}' has no configuration file in {}", .dir.display())]
    MissingDefault { name: String, dir: PathBuf },

    #[error("malformed configuration in {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("invalid baseUrl '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("unrecognized value '{value}' for {key} (expected one of: {expected})")]
    UnrecognizedValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type E2eResult<T> = Result<T, E2eError>;
