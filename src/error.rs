//! Error types for the analysis path.
//!
//! Everything outside the model call (I/O, SQL, configuration) uses
//! `anyhow`. The analysis path has typed errors so callers can tell a
//! flaky endpoint from a malformed reply.

use thiserror::Error;

/// Failure of a single remote model call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// Rate limited, server-side failure, or a connect/timeout error. Retried.
    #[error("transient model API error{}: {message}", status_suffix(.status))]
    Transient {
        status: Option<u16>,
        message: String,
    },

    /// Any other failure. Not retried.
    #[error("model API error{}: {message}", status_suffix(.status))]
    Permanent {
        status: Option<u16>,
        message: String,
    },
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transient { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {}", s)).unwrap_or_default()
}

/// Failure of one `analyze` request.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("model request failed after {attempts} attempt(s): {source}")]
    Remote {
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    #[error("failed to parse JSON reply from model: {message} (reply: {snippet})")]
    Parse { message: String, snippet: String },

    #[error("model reply failed validation: {0}")]
    Validation(String),
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
