//! GitHub REST v3 adapter
//!
//! Implements every capability trait in [`super::client`] on top of a shared
//! `reqwest` client. Each call is a single request except workflow dispatch,
//! which has to look the new run up after the fact because the dispatch
//! endpoint answers `204 No Content`.

use super::client::{
    BranchComparator, CheckRunRegistry, IssueAnnotator, ReleaseStore, WorkflowDispatcher,
};
use super::error::ApiError;
use super::types::{CheckRun, Comparison, WorkflowRun};
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("checkrun-cascade/", env!("CARGO_PKG_VERSION"));
const DISPATCH_POLL_ATTEMPTS: usize = 10;
const DISPATCH_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct GitHubRestClient {
    base_url: String,
    http_client: Client,
    timeout: Duration,
}

impl GitHubRestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            timeout,
        })
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        auth: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, path, "GitHub API request");

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .bearer_auth(auth);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                error!("GitHub request timed out after {:?}", self.timeout);
            }
            ApiError::Network {
                message: format!("{} {} failed: {}", method, path, e),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status.as_u16() != 404 {
                warn!(%method, path, status = status.as_u16(), "GitHub API returned error");
            }
            return Err(ApiError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status_code: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn request_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        auth: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, auth, path, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, auth: &str, path: &str) -> Result<T, ApiError> {
        self.request_json::<T, ()>(Method::GET, auth, path, None)
            .await
    }

    async fn latest_dispatch_run_id(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        workflow_file: &str,
        git_ref: &str,
    ) -> Result<Option<WorkflowRunEntry>, ApiError> {
        let path = format!(
            "/repos/{}/{}/actions/workflows/{}/runs?event=workflow_dispatch&branch={}&per_page=1",
            owner, repo, workflow_file, git_ref
        );
        let runs: WorkflowRunsResponse = self.get_json(auth, &path).await?;
        Ok(runs.workflow_runs.into_iter().max_by_key(|r| r.id))
    }
}

impl fmt::Debug for GitHubRestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubRestClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CheckRunsResponse {
    check_runs: Vec<CheckRun>,
}

#[derive(Debug, Serialize)]
struct QueueOutput<'a> {
    title: &'a str,
    summary: &'a str,
}

#[derive(Debug, Serialize)]
struct QueueCheckRunRequest<'a> {
    name: &'a str,
    head_sha: &'a str,
    status: &'static str,
    output: QueueOutput<'a>,
}

#[derive(Debug, Serialize)]
struct DispatchRequest<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunsResponse {
    workflow_runs: Vec<WorkflowRunEntry>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunEntry {
    id: u64,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct IssueComment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

#[async_trait]
impl CheckRunRegistry for GitHubRestClient {
    async fn list_check_runs_for_commit(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        workflow_name: &str,
    ) -> Result<Vec<CheckRun>, ApiError> {
        let path = format!(
            "/repos/{}/{}/commits/{}/check-runs?check_name={}&filter=all&per_page=100",
            owner, repo, commit_sha, workflow_name
        );
        let response: CheckRunsResponse = self.get_json(auth, &path).await?;
        Ok(response.check_runs)
    }

    async fn queue_check_run(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        workflow_name: &str,
        title: &str,
        summary: &str,
    ) -> Result<CheckRun, ApiError> {
        let path = format!("/repos/{}/{}/check-runs", owner, repo);
        let body = QueueCheckRunRequest {
            name: workflow_name,
            head_sha: commit_sha,
            status: "queued",
            output: QueueOutput { title, summary },
        };
        self.request_json(Method::POST, auth, &path, Some(&body))
            .await
    }
}

#[async_trait]
impl WorkflowDispatcher for GitHubRestClient {
    async fn dispatch(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<WorkflowRun, ApiError> {
        let previous = self
            .latest_dispatch_run_id(auth, owner, repo, workflow_file, git_ref)
            .await?
            .map(|r| r.id)
            .unwrap_or(0);

        let path = format!(
            "/repos/{}/{}/actions/workflows/{}/dispatches",
            owner, repo, workflow_file
        );
        let body = DispatchRequest { git_ref, inputs };
        self.send(Method::POST, auth, &path, Some(&body)).await?;

        for _ in 0..DISPATCH_POLL_ATTEMPTS {
            tokio::time::sleep(DISPATCH_POLL_INTERVAL).await;
            if let Some(run) = self
                .latest_dispatch_run_id(auth, owner, repo, workflow_file, git_ref)
                .await?
                .filter(|r| r.id > previous)
            {
                return Ok(WorkflowRun {
                    id: run.id,
                    html_url: run.html_url,
                });
            }
        }

        Err(ApiError::DispatchNotObserved {
            owner: owner.to_string(),
            repo: repo.to_string(),
            workflow: workflow_file.to_string(),
        })
    }
}

#[async_trait]
impl ReleaseStore for GitHubRestClient {
    async fn release_exists(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<bool, ApiError> {
        let path = format!("/repos/{}/{}/releases/tags/{}", owner, repo, tag);
        match self.send::<()>(Method::GET, auth, &path, None).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl BranchComparator for GitHubRestClient {
    async fn compare(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Comparison, ApiError> {
        let path = format!("/repos/{}/{}/compare/{}...{}", owner, repo, base, head);
        self.get_json(auth, &path).await
    }
}

#[async_trait]
impl IssueAnnotator for GitHubRestClient {
    /// Finds the pull request comment that links to the upstream run
    async fn find_annotation_id(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        details_url: &str,
    ) -> Result<Option<u64>, ApiError> {
        let path = format!(
            "/search/issues?q=repo:{}/{}+{}+type:pr",
            owner, repo, commit_sha
        );
        let search: SearchResponse = self.get_json(auth, &path).await?;

        for item in search.items {
            let path = format!(
                "/repos/{}/{}/issues/{}/comments?per_page=100",
                owner, repo, item.number
            );
            let comments: Vec<IssueComment> = self.get_json(auth, &path).await?;
            if let Some(comment) = comments
                .into_iter()
                .find(|c| c.body.as_deref().is_some_and(|b| b.contains(details_url)))
            {
                return Ok(Some(comment.id));
            }
        }

        Ok(None)
    }

    async fn append_to_annotation(
        &self,
        auth: &str,
        owner: &str,
        repo: &str,
        annotation_id: u64,
        text: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/repos/{}/{}/issues/comments/{}", owner, repo, annotation_id);
        let comment: IssueComment = self.get_json(auth, &path).await?;
        let body = format!("{}\n\n{}", comment.body.unwrap_or_default(), text);
        self.request_json::<IssueComment, _>(
            Method::PATCH,
            auth,
            &path,
            Some(&CommentBody { body: &body }),
        )
        .await?;
        Ok(())
    }
}
