//! Fan-in join
//!
//! Gates the final stage on every fan-out partition having completed
//! successfully for the same upstream run. Partial completion is a normal,
//! quiescent state and produces a report rather than an error.

use super::correlation::{snapshot_title, ArtifactsSummary, RunLink};
use super::error::CascadeError;
use super::fan_out::select_latest;
use super::layout::PipelineLayout;
use super::stage::StageDescriptor;
use crate::github::{CheckRun, GitHubServices, TokenCache};
use futures_util::future::try_join_all;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Where a single partition stands from the join's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinStatus {
    Missing,
    Pending { url: String },
    Failed { url: String, conclusion: String },
    Succeeded { run: Box<CheckRun> },
}

impl JoinStatus {
    pub fn of(latest: Option<&CheckRun>) -> Self {
        match latest {
            None => JoinStatus::Missing,
            Some(run) if !run.is_completed() => JoinStatus::Pending {
                url: run.html_url.clone(),
            },
            Some(run) if run.succeeded() => JoinStatus::Succeeded {
                run: Box::new(run.clone()),
            },
            Some(run) => JoinStatus::Failed {
                url: run.html_url.clone(),
                conclusion: run
                    .conclusion
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            },
        }
    }
}

pub struct FanInJoin<'a> {
    services: &'a GitHubServices,
    tokens: &'a TokenCache,
    layout: &'a PipelineLayout,
}

impl<'a> FanInJoin<'a> {
    pub fn new(
        services: &'a GitHubServices,
        tokens: &'a TokenCache,
        layout: &'a PipelineLayout,
    ) -> Self {
        Self {
            services,
            tokens,
            layout,
        }
    }

    /// Reacts to one partition's completion
    ///
    /// Runs the idempotency guards first, then evaluates every partition and
    /// only dispatches the final stage once all of them succeeded.
    pub async fn join(
        &self,
        event_run: &CheckRun,
        stage: &StageDescriptor,
    ) -> Result<String, CascadeError> {
        if let Some(report) = self.guard(event_run, stage).await? {
            return Ok(report);
        }

        let statuses = self.partition_statuses(event_run, stage).await?;

        if let Some((partition, url, conclusion)) =
            statuses.iter().find_map(|(partition, status)| match status {
                JoinStatus::Failed { url, conclusion } => Some((partition, url, conclusion)),
                _ => None,
            })
        {
            return Err(CascadeError::DownstreamStageFailed {
                stage: self.layout.fan_out_stage_name(partition),
                url: url.clone(),
                conclusion: conclusion.clone(),
            });
        }

        let waiting: Vec<String> = statuses
            .iter()
            .filter_map(|(partition, status)| {
                let workflow_name = self.layout.fan_out_stage_name(partition);
                match status {
                    JoinStatus::Missing => Some(format!(
                        "Won't trigger '{}' in reaction to {} because the '{}' run does not exist yet.",
                        self.layout.join_stage, event_run.name, workflow_name
                    )),
                    JoinStatus::Pending { url } => Some(format!(
                        "The '{}' run at {} did not complete yet.",
                        workflow_name, url
                    )),
                    _ => None,
                }
            })
            .collect();
        if !waiting.is_empty() {
            debug!(waiting = waiting.len(), "Fan-in not ready");
            return Ok(waiting.join("\n"));
        }

        let mut inputs = BTreeMap::new();
        for (partition, status) in &statuses {
            if let JoinStatus::Succeeded { run } = status {
                let link = RunLink::decode(run.output.text(), &self.layout.automation)?;
                inputs.insert(
                    self.layout.join_input_name(partition),
                    link.run_id.to_string(),
                );
            }
        }

        self.trigger_final_stage(stage, &inputs).await
    }

    /// Idempotency and safety checks; `Some` means there is nothing to do
    async fn guard(
        &self,
        event_run: &CheckRun,
        stage: &StageDescriptor,
    ) -> Result<Option<String>, CascadeError> {
        let snapshot_tag = self.layout.snapshot_tag(&stage.version);
        let snapshots = &self.layout.snapshots;
        let snapshots_token = self.tokens.get(&snapshots.owner, &snapshots.name).await?;
        if self
            .services
            .releases
            .release_exists(
                &snapshots_token,
                &snapshots.owner,
                &snapshots.name,
                &snapshot_tag,
            )
            .await?
        {
            info!(tag = %snapshot_tag, "Snapshot already published");
            return Ok(Some(format!(
                "Ignoring {} check-run because the snapshot for {} was already uploaded to {}",
                event_run.name,
                stage.commit_sha,
                self.layout.snapshot_release_url(&snapshot_tag)
            )));
        }

        let origin = &self.layout.origin;
        let origin_token = self.tokens.get(&origin.owner, &origin.name).await?;
        let comparison = self
            .services
            .branches
            .compare(
                &origin_token,
                &origin.owner,
                &origin.name,
                "HEAD",
                &stage.commit_sha,
            )
            .await?;
        if comparison.behind_by > 0 {
            info!(
                commit = %stage.commit_sha,
                behind_by = comparison.behind_by,
                "Commit not on main branch"
            );
            return Ok(Some(format!(
                "Ignoring {} check-run because its corresponding commit {} is not on the {} branch",
                event_run.name, stage.commit_sha, self.layout.branch
            )));
        }

        Ok(None)
    }

    /// Latest run per partition whose summary is exactly the expected one
    ///
    /// The event's own run stands in for its partition without a listing call.
    pub async fn partition_statuses(
        &self,
        event_run: &CheckRun,
        stage: &StageDescriptor,
    ) -> Result<Vec<(String, JoinStatus)>, CascadeError> {
        let needle = ArtifactsSummary {
            version: stage.version.clone(),
            commit_sha: stage.commit_sha.clone(),
            upstream_run_id: stage.upstream_run_id,
        }
        .encode();

        let origin = &self.layout.origin;
        let token = self.tokens.get(&origin.owner, &origin.name).await?;

        let lookups = self.layout.partitions.iter().map(|partition| {
            let token = token.as_str();
            let needle = needle.as_str();
            async move {
                let workflow_name = self.layout.fan_out_stage_name(partition);
                let runs = if event_run.name == workflow_name {
                    vec![event_run.clone()]
                } else {
                    self.services
                        .check_runs
                        .list_check_runs_for_commit(
                            token,
                            &origin.owner,
                            &origin.name,
                            &stage.commit_sha,
                            &workflow_name,
                        )
                        .await?
                };
                let latest = select_latest(&runs, |run| run.output.summary() == needle);
                Ok::<_, CascadeError>((partition.clone(), JoinStatus::of(latest)))
            }
        });

        try_join_all(lookups).await
    }

    async fn trigger_final_stage(
        &self,
        stage: &StageDescriptor,
        inputs: &BTreeMap<String, String>,
    ) -> Result<String, CascadeError> {
        let title = snapshot_title(&self.layout.snapshot_tag(&stage.version));

        let origin = &self.layout.origin;
        let origin_token = self.tokens.get(&origin.owner, &origin.name).await?;
        let existing = self
            .services
            .check_runs
            .list_check_runs_for_commit(
                &origin_token,
                &origin.owner,
                &origin.name,
                &stage.commit_sha,
                &self.layout.join_stage,
            )
            .await?;
        // A failed upload may be retried by re-delivering a member event
        if let Some(run) = select_latest(&existing, |run| run.output.summary() == title)
            .filter(|run| !run.is_completed() || run.succeeded())
        {
            debug!(url = %run.html_url, "Final stage already triggered");
            return Ok(format!(
                "The '{}' run already exists at {}.",
                self.layout.join_stage, run.html_url
            ));
        }

        self.services
            .check_runs
            .queue_check_run(
                &origin_token,
                &origin.owner,
                &origin.name,
                &stage.commit_sha,
                &self.layout.join_stage,
                &title,
                &title,
            )
            .await?;

        let automation = &self.layout.automation;
        let automation_token = self.tokens.get(&automation.owner, &automation.name).await?;
        let run = self
            .services
            .workflows
            .dispatch(
                &automation_token,
                &automation.owner,
                &automation.name,
                &self.layout.join_workflow,
                &self.layout.branch,
                inputs,
            )
            .await?;

        info!(run_id = run.id, commit = %stage.commit_sha, "Started final stage");
        Ok(format!(
            "The '{}' workflow run was started at {}",
            self.layout.join_stage, run.html_url
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{CheckRunOutput, CheckRunStatus, Conclusion};

    fn run(status: CheckRunStatus, conclusion: Option<Conclusion>) -> CheckRun {
        CheckRun {
            id: 3,
            name: "git-artifacts-i686".to_string(),
            head_sha: "abc".to_string(),
            status,
            conclusion,
            details_url: None,
            html_url: "https://github.com/o/r/runs/3".to_string(),
            url: None,
            output: CheckRunOutput::default(),
        }
    }

    #[test]
    fn test_join_status() {
        assert_eq!(JoinStatus::of(None), JoinStatus::Missing);
        assert_eq!(
            JoinStatus::of(Some(&run(CheckRunStatus::InProgress, None))),
            JoinStatus::Pending {
                url: "https://github.com/o/r/runs/3".to_string()
            }
        );
        assert!(matches!(
            JoinStatus::of(Some(&run(CheckRunStatus::Completed, Some(Conclusion::Success)))),
            JoinStatus::Succeeded { .. }
        ));
        assert!(matches!(
            JoinStatus::of(Some(&run(CheckRunStatus::Completed, Some(Conclusion::TimedOut)))),
            JoinStatus::Failed { .. }
        ));
    }
}
