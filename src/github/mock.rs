use super::client::{
    BranchComparator, CheckRunRegistry, IssueAnnotator, ReleaseStore, WorkflowDispatcher,
};
use super::error::ApiError;
use super::types::{
    CheckRun, CheckRunOutput, CheckRunStatus, Comparison, Conclusion, RepoRef, WorkflowRun,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

/// A recorded `queue_check_run` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCheckRun {
    pub repo: RepoRef,
    pub commit_sha: String,
    pub workflow_name: String,
    pub title: String,
    pub summary: String,
}

/// A recorded `dispatch` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchCall {
    pub repo: RepoRef,
    pub workflow_file: String,
    pub git_ref: String,
    pub inputs: BTreeMap<String, String>,
    pub run: WorkflowRun,
}

#[derive(Debug, Clone)]
struct StoredCheckRun {
    repo: RepoRef,
    run: CheckRun,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    check_runs: Vec<StoredCheckRun>,
    queued: Vec<QueuedCheckRun>,
    dispatches: Vec<DispatchCall>,
    releases: HashSet<(RepoRef, String)>,
    release_error: Option<ApiError>,
    behind_by: HashMap<(RepoRef, String), u64>,
    annotations: HashMap<(RepoRef, String), u64>,
    appended: Vec<(u64, String)>,
    list_calls: usize,
}

/// In-memory stand-in for the GitHub API
///
/// Queued check-runs become visible to subsequent listings, so the cascade's
/// existence checks behave as they would against the real service.
pub struct MockGitHub {
    state: Mutex<MockState>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn allocate_id(state: &mut MockState) -> u64 {
        state.next_id += 1;
        state.next_id
    }

    /// Seeds an existing check-run and returns it with its assigned ID
    pub fn add_check_run(
        &self,
        repo: &RepoRef,
        commit_sha: &str,
        name: &str,
        status: CheckRunStatus,
        conclusion: Option<Conclusion>,
        output: CheckRunOutput,
    ) -> CheckRun {
        let mut state = self.state();
        let id = Self::allocate_id(&mut state);
        let run = CheckRun {
            id,
            name: name.to_string(),
            head_sha: commit_sha.to_string(),
            status,
            conclusion,
            details_url: None,
            html_url: format!("https://github.com/{}/runs/{}", repo, id),
            url: Some(format!("https://api.github.com/repos/{}/check-runs/{}", repo, id)),
            output,
        };
        state.check_runs.push(StoredCheckRun {
            repo: repo.clone(),
            run: run.clone(),
        });
        run
    }

    /// Marks a stored check-run as completed, optionally attaching `text`
    pub fn complete_check_run(
        &self,
        id: u64,
        conclusion: Conclusion,
        text: Option<String>,
    ) -> Option<CheckRun> {
        let mut state = self.state();
        let stored = state.check_runs.iter_mut().find(|s| s.run.id == id)?;
        stored.run.status = CheckRunStatus::Completed;
        stored.run.conclusion = Some(conclusion);
        if text.is_some() {
            stored.run.output.text = text;
        }
        Some(stored.run.clone())
    }

    pub fn check_run(&self, id: u64) -> Option<CheckRun> {
        self.state()
            .check_runs
            .iter()
            .find(|s| s.run.id == id)
            .map(|s| s.run.clone())
    }

    pub fn add_release(&self, repo: &RepoRef, tag: &str) {
        self.state().releases.insert((repo.clone(), tag.to_string()));
    }

    /// Makes every release probe fail with `error`
    pub fn fail_release_probe(&self, error: ApiError) {
        self.state().release_error = Some(error);
    }

    pub fn set_behind_by(&self, repo: &RepoRef, head: &str, behind_by: u64) {
        self.state()
            .behind_by
            .insert((repo.clone(), head.to_string()), behind_by);
    }

    pub fn add_annotation(&self, repo: &RepoRef, commit_sha: &str, id: u64) {
        self.state()
            .annotations
            .insert((repo.clone(), commit_sha.to_string()), id);
    }

    pub fn queued(&self) -> Vec<QueuedCheckRun> {
        self.state().queued.clone()
    }

    pub fn dispatches(&self) -> Vec<DispatchCall> {
        self.state().dispatches.clone()
    }

    pub fn appended(&self) -> Vec<(u64, String)> {
        self.state().appended.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    /// Number of mutating calls (queues, dispatches, annotations) seen so far
    pub fn side_effects(&self) -> usize {
        let state = self.state();
        state.queued.len() + state.dispatches.len() + state.appended.len()
    }
}

impl Default for MockGitHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockGitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MockGitHub")
            .field("check_runs", &state.check_runs.len())
            .field("dispatches", &state.dispatches.len())
            .finish()
    }
}

#[async_trait]
impl CheckRunRegistry for MockGitHub {
    async fn list_check_runs_for_commit(
        &self,
        _auth: &str,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        workflow_name: &str,
    ) -> Result<Vec<CheckRun>, ApiError> {
        let mut state = self.state();
        state.list_calls += 1;
        Ok(state
            .check_runs
            .iter()
            .filter(|s| {
                s.repo.owner == owner
                    && s.repo.name == repo
                    && s.run.head_sha == commit_sha
                    && s.run.name == workflow_name
            })
            .map(|s| s.run.clone())
            .collect())
    }

    async fn queue_check_run(
        &self,
        _auth: &str,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        workflow_name: &str,
        title: &str,
        summary: &str,
    ) -> Result<CheckRun, ApiError> {
        let repo_ref = RepoRef::new(owner, repo);
        self.state().queued.push(QueuedCheckRun {
            repo: repo_ref.clone(),
            commit_sha: commit_sha.to_string(),
            workflow_name: workflow_name.to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
        });
        Ok(self.add_check_run(
            &repo_ref,
            commit_sha,
            workflow_name,
            CheckRunStatus::Queued,
            None,
            CheckRunOutput {
                title: Some(title.to_string()),
                summary: Some(summary.to_string()),
                text: None,
            },
        ))
    }
}

#[async_trait]
impl WorkflowDispatcher for MockGitHub {
    async fn dispatch(
        &self,
        _auth: &str,
        owner: &str,
        repo: &str,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<WorkflowRun, ApiError> {
        let mut state = self.state();
        let id = Self::allocate_id(&mut state);
        let run = WorkflowRun {
            id,
            html_url: format!("https://github.com/{}/{}/actions/runs/{}", owner, repo, id),
        };
        state.dispatches.push(DispatchCall {
            repo: RepoRef::new(owner, repo),
            workflow_file: workflow_file.to_string(),
            git_ref: git_ref.to_string(),
            inputs: inputs.clone(),
            run: run.clone(),
        });
        Ok(run)
    }
}

#[async_trait]
impl ReleaseStore for MockGitHub {
    async fn release_exists(
        &self,
        _auth: &str,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<bool, ApiError> {
        let state = self.state();
        if let Some(error) = &state.release_error {
            return Err(error.clone());
        }
        Ok(state
            .releases
            .contains(&(RepoRef::new(owner, repo), tag.to_string())))
    }
}

#[async_trait]
impl BranchComparator for MockGitHub {
    async fn compare(
        &self,
        _auth: &str,
        owner: &str,
        repo: &str,
        _base: &str,
        head: &str,
    ) -> Result<Comparison, ApiError> {
        let behind_by = self
            .state()
            .behind_by
            .get(&(RepoRef::new(owner, repo), head.to_string()))
            .copied()
            .unwrap_or(0);
        Ok(Comparison {
            ahead_by: 0,
            behind_by,
        })
    }
}

#[async_trait]
impl IssueAnnotator for MockGitHub {
    async fn find_annotation_id(
        &self,
        _auth: &str,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        _details_url: &str,
    ) -> Result<Option<u64>, ApiError> {
        Ok(self
            .state()
            .annotations
            .get(&(RepoRef::new(owner, repo), commit_sha.to_string()))
            .copied())
    }

    async fn append_to_annotation(
        &self,
        _auth: &str,
        _owner: &str,
        _repo: &str,
        annotation_id: u64,
        text: &str,
    ) -> Result<(), ApiError> {
        self.state().appended.push((annotation_id, text.to_string()));
        Ok(())
    }
}
