//! GitHub API error types

use thiserror::Error;

/// Errors raised by the GitHub capability layer
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The API answered with a non-success status
    #[error("GitHub API error ({status_code}) for {method} {path}: {message}")]
    Status {
        method: String,
        path: String,
        status_code: u16,
        message: String,
    },

    /// Transport-level failure (connect, TLS, timeout)
    #[error("Network error: {message}")]
    Network { message: String },

    /// The API answered with a body we could not interpret
    #[error("Invalid response from {path}: {message}")]
    InvalidResponse { path: String, message: String },

    /// No credentials are available for the repository
    #[error("No token available for {owner}/{repo}")]
    MissingToken { owner: String, repo: String },

    /// A dispatched workflow run never became visible
    #[error("Workflow run for {workflow} in {owner}/{repo} did not show up after dispatch")]
    DispatchNotObserved {
        owner: String,
        repo: String,
        workflow: String,
    },
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// The only failure the cascade treats as an answer rather than an error
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}
