//! Cascade error taxonomy
//!
//! Every variant is fatal for the event being processed and is never retried
//! here. Quiescent outcomes (nothing to do yet, already published, not on the
//! main branch) are not errors and come back as `Ok` reports instead.

use crate::github::{ApiError, RepoRef};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CascadeError {
    /// The stage that should trigger the next one did not succeed
    #[error("{stage} run {run_id} completed with {conclusion}: {url}")]
    UpstreamStageFailed {
        stage: String,
        run_id: u64,
        conclusion: String,
        url: String,
    },

    /// A stage produced text the cascade cannot parse
    #[error("Could not parse {field} from '{input}' of {stage} run {run_id}: {url}")]
    MalformedStageOutput {
        stage: String,
        run_id: u64,
        field: &'static str,
        input: String,
        url: String,
    },

    /// A correlation fragment did not have the expected shape
    #[error("Unhandled {fragment}: '{input}'")]
    MalformedCorrelationData {
        fragment: &'static str,
        input: String,
    },

    /// The event and its text payload disagree about the commit
    #[error("Expected {expected} in summary '{summary}' of {stage} run {run_id}: {url}")]
    ProvenanceMismatch {
        stage: String,
        run_id: u64,
        expected: String,
        summary: String,
        url: String,
    },

    /// Data originates from a repository other than the trusted one
    #[error("Unexpected repository {found} (only {expected} is trusted)")]
    UnexpectedProvenance { found: RepoRef, expected: RepoRef },

    /// A fanned-out or joined stage completed without success
    #[error("The '{stage}' run at {url} did not succeed (concluded with {conclusion})")]
    DownstreamStageFailed {
        stage: String,
        url: String,
        conclusion: String,
    },

    /// A collaborator call failed; passed through unchanged
    #[error(transparent)]
    Api(#[from] ApiError),
}
