//! Error types for the E2E harness

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: Box<E2eError>,
    },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Fixture parse error in {}: {reason}", path.display())]
    FixtureParse { path: PathBuf, reason: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("MySQL error: {0}")]
    MySql(#[from] sqlx::Error),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Option {name} not found in database")]
    OptionMissing { name: String },

    #[error("Option {name} mismatch: expected '{expected}', got '{actual}'")]
    OptionMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Bootstrap aborted during {phase}: {source}")]
    BootstrapAborted {
        phase: String,
        #[source]
        source: Box<E2eError>,
    },

    #[error("{operation} failed with empty error")]
    Undescribed {
        operation: String,
        #[source]
        source: Box<E2eError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl E2eError {
    /// Keep the error as-is unless it carries no detail, in which case wrap it
    /// in an error naming `operation` with the original kept as the source.
    pub fn described(self, operation: &str) -> Self {
        if self.is_blank() {
            E2eError::Undescribed {
                operation: operation.to_string(),
                source: Box::new(self),
            }
        } else {
            self
        }
    }

    /// True when the underlying failure has no message of its own.
    fn is_blank(&self) -> bool {
        fn blank(detail: impl ToString) -> bool {
            detail.to_string().trim().is_empty()
        }

        match self {
            E2eError::Browser(detail)
            | E2eError::ElementNotFound(detail)
            | E2eError::Timeout(detail)
            | E2eError::Config(detail)
            | E2eError::AssertionFailed(detail) => blank(detail),
            E2eError::Cdp(e) => blank(e),
            E2eError::Sqlite(e) => blank(e),
            E2eError::MySql(e) => blank(e),
            E2eError::Io(e) => blank(e),
            E2eError::Navigation { source, .. } => source.is_blank(),
            _ => false,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
