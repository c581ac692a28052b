//! Error taxonomy shared by the rule registry, the event store and the
//! ingestion coordinator.

use thiserror::Error;

/// Result alias used across the workspace
pub type FirehoseResult<T> = Result<T, FirehoseError>;

/// Errors surfaced by rule synchronization and storage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FirehoseError {
    /// Network or connection failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote service answered with a non-success status
    #[error("Remote error: status {status}: {body}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// Malformed input (empty record, negative page, rejected rule syntax)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A cooperative wait was interrupted
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Longest remote body kept in a [`FirehoseError::Remote`]
const MAX_REMOTE_BODY: usize = 512;

impl FirehoseError {
    /// Build a remote error, truncating oversized bodies on a char boundary
    pub fn remote(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > MAX_REMOTE_BODY {
            let mut cut = MAX_REMOTE_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Self::Remote { status, body }
    }

    /// Whether the caller may retry the same request unchanged.
    ///
    /// Transport failures always qualify; remote errors only for 5xx and 429.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Remote { status, .. } => *status >= 500 || *status == 429,
            Self::Validation(_) | Self::Cancelled(_) => false,
        }
    }

    /// True for [`FirehoseError::Cancelled`]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
