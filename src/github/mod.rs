//! Code-hosting service integration
//!
//! The cascade only ever talks to GitHub through the capability traits in
//! [`client`]. [`GitHubRestClient`] implements them over the REST API and
//! [`MockGitHub`] keeps everything in memory for tests.

mod client;
mod error;
mod mock;
mod rest;
mod token;
mod types;

pub use client::{
    BranchComparator, CheckRunRegistry, GitHubServices, IssueAnnotator, ReleaseStore,
    WorkflowDispatcher,
};
pub use error::ApiError;
pub use mock::{DispatchCall, MockGitHub, QueuedCheckRun};
pub use rest::{GitHubRestClient, DEFAULT_API_URL};
pub use token::{StaticTokenProvider, TokenCache, TokenProvider};
pub use types::{
    CheckRun, CheckRunOutput, CheckRunStatus, Comparison, Conclusion, RepoRef, WorkflowRun,
};
