//! Error taxonomy shared by the session and fetch operations.

use thiserror::Error;

/// Errors produced while talking to the remote service or validating input.
///
/// None of these ever escape a coordinator operation: they are logged and
/// folded into a `Failed` status plus a `false` completion flag.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credentials are missing, malformed or were rejected by the server.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// A required input (session token, school year) is not available.
    #[error("precondition unmet: {0}")]
    PreconditionUnmet(&'static str),
    /// Network or server failure while performing a request.
    #[error("remote request failed")]
    Remote(#[source] anyhow::Error),
    /// The server answered but the response held nothing usable.
    #[error("server returned no usable data")]
    NoDataReturned,
    /// School year selector with a semester outside `1..=3`.
    #[error("invalid semester {0}, expected 1, 2 or 3")]
    InvalidSchoolYear(u8),
}

impl SyncError {
    /// Wrap any error as a remote failure.
    pub fn remote(err: impl Into<anyhow::Error>) -> Self {
        Self::Remote(err.into())
    }
}

/// Convenience alias used across the crate.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
