#![allow(dead_code)]

use checkrun_cascade::cascade::correlation::{ArtifactsSummary, RunLink, TagSummary};
use checkrun_cascade::cascade::{
    CascadeOrchestrator, CheckRunEvent, Owner, PipelineLayout, Repository,
};
use checkrun_cascade::github::{
    CheckRun, CheckRunOutput, CheckRunRegistry, CheckRunStatus, Conclusion, GitHubServices,
    MockGitHub, RepoRef, StaticTokenProvider, TokenCache,
};
use std::sync::Arc;

pub const COMMIT: &str = "abc123";
pub const VERSION: &str = "v1.2.3";
pub const TAG_GIT_RUN_ID: u64 = 4242;

pub fn origin() -> RepoRef {
    RepoRef::new("git-for-windows", "git")
}

pub fn automation() -> RepoRef {
    RepoRef::new("git-for-windows", "git-for-windows-automation")
}

pub fn snapshots() -> RepoRef {
    RepoRef::new("git-for-windows", "git-snapshots")
}

pub fn run_link(run_id: u64) -> String {
    RunLink {
        repo: automation(),
        run_id,
    }
    .encode()
}

pub fn artifacts_summary(upstream_run_id: u64) -> ArtifactsSummary {
    ArtifactsSummary {
        version: VERSION.to_string(),
        commit_sha: COMMIT.to_string(),
        upstream_run_id,
    }
}

/// Orchestrator wired to an in-memory GitHub
pub struct Harness {
    pub mock: Arc<MockGitHub>,
    pub orchestrator: CascadeOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        let mock = Arc::new(MockGitHub::new());
        let tokens = TokenCache::new(Arc::new(StaticTokenProvider::new(Some(
            "test-token".to_string(),
        ))));
        let orchestrator = CascadeOrchestrator::new(
            GitHubServices::from_single(mock.clone()),
            Arc::new(tokens),
            PipelineLayout::default(),
        );
        Self { mock, orchestrator }
    }

    /// Seeds a fan-out check-run tagged with `upstream_run_id`
    pub fn seed_partition(
        &self,
        partition: &str,
        upstream_run_id: u64,
        status: CheckRunStatus,
        conclusion: Option<Conclusion>,
        workflow_run_id: Option<u64>,
    ) -> CheckRun {
        let artifacts = artifacts_summary(upstream_run_id);
        self.mock.add_check_run(
            &origin(),
            COMMIT,
            &format!("git-artifacts-{}", partition),
            status,
            conclusion,
            CheckRunOutput {
                title: Some(artifacts.title()),
                summary: Some(artifacts.encode()),
                text: workflow_run_id.map(run_link),
            },
        )
    }

    /// Marks a stored fan-out run as done, linking it to `workflow_run_id`
    pub fn finish(&self, id: u64, conclusion: Conclusion, workflow_run_id: u64) -> CheckRun {
        self.mock
            .complete_check_run(id, conclusion, Some(run_link(workflow_run_id)))
            .expect("check-run exists")
    }

    /// Latest stored fan-out check-run for `partition`
    pub async fn latest_partition_run(&self, partition: &str) -> CheckRun {
        self.latest_run_named(&format!("git-artifacts-{}", partition))
            .await
    }

    /// Latest stored check-run on the origin commit called `name`
    pub async fn latest_run_named(&self, name: &str) -> CheckRun {
        let origin = origin();
        self.mock
            .list_check_runs_for_commit("test-token", &origin.owner, &origin.name, COMMIT, name)
            .await
            .unwrap()
            .into_iter()
            .max_by_key(|run| run.id)
            .unwrap_or_else(|| panic!("no {} run stored", name))
    }
}

pub fn event(action: &str, repo: &RepoRef, check_run: CheckRun) -> CheckRunEvent {
    CheckRunEvent {
        action: action.to_string(),
        repository: Repository {
            owner: Owner {
                login: repo.owner.clone(),
            },
            name: repo.name.clone(),
        },
        check_run,
    }
}

pub fn tag_git_run(conclusion: Conclusion, summary: &str, text: &str) -> CheckRun {
    CheckRun {
        id: 1,
        name: "tag-git".to_string(),
        head_sha: COMMIT.to_string(),
        status: CheckRunStatus::Completed,
        conclusion: Some(conclusion),
        details_url: Some(format!(
            "https://github.com/{}/actions/runs/{}",
            automation(),
            TAG_GIT_RUN_ID
        )),
        html_url: "https://github.com/git-for-windows/git/runs/1".to_string(),
        url: Some("https://api.github.com/repos/git-for-windows/git/check-runs/1".to_string()),
        output: CheckRunOutput {
            title: Some("Tag Git".to_string()),
            summary: Some(summary.to_string()),
            text: Some(text.to_string()),
        },
    }
}

/// A successful `tag-git` completion for [`VERSION`] at [`COMMIT`]
pub fn tag_git_event() -> CheckRunEvent {
    let summary = TagSummary {
        version: VERSION.to_string(),
        commit_sha: COMMIT.to_string(),
    }
    .encode();
    event(
        "completed",
        &origin(),
        tag_git_run(Conclusion::Success, &summary, &run_link(TAG_GIT_RUN_ID)),
    )
}
