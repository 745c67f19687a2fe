use super::error::CascadeError;
use super::event::CheckRunEvent;
use super::fan_in::FanInJoin;
use super::fan_out::FanOutDispatcher;
use super::layout::PipelineLayout;
use super::stage::{StageKind, StageResolver};
use crate::github::{GitHubServices, TokenCache};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entry point for check-run webhook deliveries
///
/// Every branch derives its decision from the current check-run state, so
/// handling the same delivery twice is safe.
pub struct CascadeOrchestrator {
    services: GitHubServices,
    tokens: Arc<TokenCache>,
    layout: PipelineLayout,
}

impl CascadeOrchestrator {
    pub fn new(services: GitHubServices, tokens: Arc<TokenCache>, layout: PipelineLayout) -> Self {
        Self {
            services,
            tokens,
            layout,
        }
    }

    pub fn layout(&self) -> &PipelineLayout {
        &self.layout
    }

    /// Handles one event and returns a human-readable outcome
    pub async fn handle(&self, event: &CheckRunEvent) -> Result<String, CascadeError> {
        let check_run = &event.check_run;
        info!(
            action = %event.action,
            name = %check_run.name,
            run_id = check_run.id,
            commit = %check_run.head_sha,
            "Handling check-run event"
        );

        if event.action != "completed" {
            return Ok(format!("Unhandled action: {}", event.action));
        }

        let resolver = StageResolver::new(&self.layout);
        match resolver.classify(&check_run.name) {
            StageKind::FirstStage => {
                self.check_origin(event)?;
                let stage = resolver.resolve_first_stage(check_run)?;
                let report = FanOutDispatcher::new(&self.services, &self.tokens, &self.layout)
                    .dispatch(&stage)
                    .await?;
                self.annotate(event, &report).await?;
                Ok(report)
            }
            StageKind::FanOutMember => {
                self.check_origin(event)?;
                let stage = resolver.resolve_fan_out_member(check_run)?;
                FanInJoin::new(&self.services, &self.tokens, &self.layout)
                    .join(check_run, &stage)
                    .await
            }
            StageKind::Unrelated => Ok(format!(
                "Not a cascading run: {}; Doing nothing.",
                check_run.name
            )),
        }
    }

    fn check_origin(&self, event: &CheckRunEvent) -> Result<(), CascadeError> {
        let repo = event.repo_ref();
        if repo != self.layout.origin {
            warn!(%repo, "Refusing to handle cascading run");
            return Err(CascadeError::UnexpectedProvenance {
                found: repo,
                expected: self.layout.origin.clone(),
            });
        }
        Ok(())
    }

    /// Appends the fan-out report to the comment tracking this cascade, if any
    async fn annotate(&self, event: &CheckRunEvent, report: &str) -> Result<(), CascadeError> {
        let Some(details_url) = event.check_run.details_url.as_deref() else {
            debug!("No details URL, skipping annotation");
            return Ok(());
        };

        let repo = event.repo_ref();
        let token = self.tokens.get(&repo.owner, &repo.name).await?;
        let annotation = self
            .services
            .annotator
            .find_annotation_id(
                &token,
                &repo.owner,
                &repo.name,
                &event.check_run.head_sha,
                details_url,
            )
            .await?;

        if let Some(id) = annotation {
            self.services
                .annotator
                .append_to_annotation(&token, &repo.owner, &repo.name, id, report)
                .await?;
            debug!(comment_id = id, "Appended report to comment");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::event::{Owner, Repository};
    use crate::github::{
        CheckRun, CheckRunOutput, CheckRunStatus, Conclusion, MockGitHub, StaticTokenProvider,
    };

    fn orchestrator(mock: Arc<MockGitHub>) -> CascadeOrchestrator {
        CascadeOrchestrator::new(
            GitHubServices::from_single(mock),
            Arc::new(TokenCache::new(Arc::new(StaticTokenProvider::new(Some(
                "token".to_string(),
            ))))),
            PipelineLayout::default(),
        )
    }

    fn event(action: &str, owner: &str, name: &str) -> CheckRunEvent {
        CheckRunEvent {
            action: action.to_string(),
            repository: Repository {
                owner: Owner {
                    login: owner.to_string(),
                },
                name: "git".to_string(),
            },
            check_run: CheckRun {
                id: 1,
                name: name.to_string(),
                head_sha: "abc123".to_string(),
                status: CheckRunStatus::Completed,
                conclusion: Some(Conclusion::Success),
                details_url: None,
                html_url: "https://github.com/git-for-windows/git/runs/1".to_string(),
                url: None,
                output: CheckRunOutput {
                    title: None,
                    summary: Some("Tag Git v1.2.3 @abc123".to_string()),
                    text: Some("For details, see [this run](https://github.com/git-for-windows/git-for-windows-automation/actions/runs/55)".to_string()),
                },
            },
        }
    }

    #[tokio::test]
    async fn test_unhandled_action() {
        let mock = Arc::new(MockGitHub::new());
        let outcome = orchestrator(mock.clone())
            .handle(&event("created", "git-for-windows", "tag-git"))
            .await
            .unwrap();
        assert_eq!(outcome, "Unhandled action: created");
        assert_eq!(mock.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_not_a_cascading_run() {
        let mock = Arc::new(MockGitHub::new());
        let outcome = orchestrator(mock.clone())
            .handle(&event("completed", "git-for-windows", "ci-build"))
            .await
            .unwrap();
        assert_eq!(outcome, "Not a cascading run: ci-build; Doing nothing.");
        assert_eq!(mock.side_effects(), 0);
    }

    #[tokio::test]
    async fn test_refuses_untrusted_repository() {
        let mock = Arc::new(MockGitHub::new());
        let err = orchestrator(mock.clone())
            .handle(&event("completed", "somebody", "tag-git"))
            .await
            .unwrap_err();
        assert!(matches!(err, CascadeError::UnexpectedProvenance { .. }));
        assert_eq!(mock.list_calls(), 0);
        assert_eq!(mock.side_effects(), 0);
    }

    #[tokio::test]
    async fn test_annotates_tracking_comment() {
        let mock = Arc::new(MockGitHub::new());
        mock.add_annotation(
            &crate::github::RepoRef::new("git-for-windows", "git"),
            "abc123",
            314,
        );
        let mut ev = event("completed", "git-for-windows", "tag-git");
        ev.check_run.details_url = Some(
            "https://github.com/git-for-windows/git-for-windows-automation/actions/runs/55"
                .to_string(),
        );

        let outcome = orchestrator(mock.clone()).handle(&ev).await.unwrap();

        let appended = mock.appended();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0], (314, outcome));
    }
}
