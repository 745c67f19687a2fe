//! Capability surfaces the cascade needs from the code-hosting service
//!
//! Each trait is a narrow seam so the cascade engine can be driven by the REST
//! adapter in production and by [`super::MockGitHub`] in tests.

use super::error::ApiError;
use super::types::{CheckRun, Comparison, WorkflowRun};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lists and queues check-runs on a commit
#[async_trait]
pub trait CheckRunRegistry: Send + Sync {
    async fn list_check_runs_for_commit(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        workflow_name: &str,
    ) -> Result<Vec<CheckRun>, ApiError>;

    async fn queue_check_run(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        workflow_name: &str,
        title: &str,
        summary: &str,
    ) -> Result<CheckRun, ApiError>;
}

/// Requests that a CI workflow start with a set of inputs
#[async_trait]
pub trait WorkflowDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<WorkflowRun, ApiError>;
}

/// Probes the terminal artifact store for a published release
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    async fn release_exists(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<bool, ApiError>;
}

/// Answers branch-membership questions
#[async_trait]
pub trait BranchComparator: Send + Sync {
    async fn compare(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Comparison, ApiError>;
}

/// Locates and extends the comment that tracks a cascade
#[async_trait]
pub trait IssueAnnotator: Send + Sync {
    async fn find_annotation_id(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        details_url: &str,
    ) -> Result<Option<u64>, ApiError>;

    async fn append_to_annotation(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        annotation_id: u64,
        text: &str,
    ) -> Result<(), ApiError>;
}

/// Every capability bundled for injection into the cascade engine
#[derive(Clone)]
pub struct GitHubServices {
    pub check_runs: Arc<dyn CheckRunRegistry>,
    pub workflows: Arc<dyn WorkflowDispatcher>,
    pub releases: Arc<dyn ReleaseStore>,
    pub branches: Arc<dyn BranchComparator>,
    pub annotator: Arc<dyn IssueAnnotator>,
}

impl GitHubServices {
    /// Uses one implementation for every capability
    pub fn from_single<T>(client: Arc<T>) -> Self
    where
        T: CheckRunRegistry
            + WorkflowDispatcher
            + ReleaseStore
            + BranchComparator
            + IssueAnnotator
            + 'static,
    {
        Self {
            check_runs: client.clone(),
            workflows: client.clone(),
            releases: client.clone(),
            branches: client.clone(),
            annotator: client,
        }
    }
}

impl std::fmt::Debug for GitHubServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubServices").finish_non_exhaustive()
    }
}
