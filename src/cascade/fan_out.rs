//! Fan-out dispatch
//!
//! Starts one fan-out run per partition for a completed upstream stage, unless
//! a run tagged with the same upstream run already exists. Existence checks for
//! the partitions go out concurrently; the writes are issued one partition at a
//! time to keep the check-then-write window small.

use super::correlation::{carries_upstream_tag, ArtifactsSummary};
use super::error::CascadeError;
use super::layout::PipelineLayout;
use super::stage::StageDescriptor;
use crate::github::{CheckRun, GitHubServices, TokenCache};
use futures_util::future::try_join_all;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Picks the most recent run among those matching `predicate`
///
/// Recency is decided by numeric ID alone; the registry assigns IDs in
/// ascending order.
pub fn select_latest<'r, P>(runs: &'r [CheckRun], predicate: P) -> Option<&'r CheckRun>
where
    P: Fn(&CheckRun) -> bool,
{
    runs.iter().filter(|run| predicate(run)).max_by_key(|run| run.id)
}

/// What the fan-out found for a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionState {
    /// A tagged run is in flight or succeeded
    Satisfied { url: String },
    /// A tagged run concluded without success; left for an operator to retry
    Failed { url: String, conclusion: String },
    /// No tagged run exists
    Missing,
}

impl PartitionState {
    pub fn of(latest: Option<&CheckRun>) -> Self {
        match latest {
            None => PartitionState::Missing,
            Some(run) if !run.is_completed() || run.succeeded() => PartitionState::Satisfied {
                url: run.html_url.clone(),
            },
            Some(run) => PartitionState::Failed {
                url: run.html_url.clone(),
                conclusion: run
                    .conclusion
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            },
        }
    }
}

pub struct FanOutDispatcher<'a> {
    services: &'a GitHubServices,
    tokens: &'a TokenCache,
    layout: &'a PipelineLayout,
}

impl<'a> FanOutDispatcher<'a> {
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

    /// Inspects every partition for runs tagged with the upstream run
    pub async fn partition_states(
        &self,
        stage: &StageDescriptor,
    ) -> Result<Vec<(String, PartitionState)>, CascadeError> {
        let origin = &self.layout.origin;
        let token = self.tokens.get(&origin.owner, &origin.name).await?;

        let lookups = self.layout.partitions.iter().map(|partition| {
            let token = token.as_str();
            async move {
                let workflow_name = self.layout.fan_out_stage_name(partition);
                let runs = self
                    .services
                    .check_runs
                    .list_check_runs_for_commit(
                        token,
                        &origin.owner,
                        &origin.name,
                        &stage.commit_sha,
                        &workflow_name,
                    )
                    .await?;
                let latest = select_latest(&runs, |run| {
                    carries_upstream_tag(run.output.summary(), stage.upstream_run_id)
                });
                Ok::<_, CascadeError>((partition.clone(), PartitionState::of(latest)))
            }
        });

        try_join_all(lookups).await
    }

    /// Triggers the missing partitions and reports on all of them
    pub async fn dispatch(&self, stage: &StageDescriptor) -> Result<String, CascadeError> {
        let mut report = String::new();
        let mut to_trigger = Vec::new();

        for (partition, state) in self.partition_states(stage).await? {
            let workflow_name = self.layout.fan_out_stage_name(&partition);
            match state {
                PartitionState::Satisfied { url } => {
                    debug!(%partition, %url, "Fan-out run already exists");
                    report.push_str(&format!("{} run already exists at {}.\n", workflow_name, url));
                }
                PartitionState::Failed { url, conclusion } => {
                    warn!(%partition, %url, %conclusion, "Fan-out run failed, not re-triggering");
                    report.push_str(&format!(
                        "{} run at {} concluded with {}; not re-triggering it.\n",
                        workflow_name, url, conclusion
                    ));
                }
                PartitionState::Missing => to_trigger.push(partition),
            }
        }

        if to_trigger.is_empty() {
            report.push_str("No workflows need to be run!\n");
            return Ok(report);
        }

        let artifacts = ArtifactsSummary {
            version: stage.version.clone(),
            commit_sha: stage.commit_sha.clone(),
            upstream_run_id: stage.upstream_run_id,
        };
        let title = artifacts.title();
        let summary = artifacts.encode();

        let origin = &self.layout.origin;
        let origin_token = self.tokens.get(&origin.owner, &origin.name).await?;
        for partition in &to_trigger {
            let workflow_name = self.layout.fan_out_stage_name(partition);
            self.services
                .check_runs
                .queue_check_run(
                    &origin_token,
                    &origin.owner,
                    &origin.name,
                    &stage.commit_sha,
                    &workflow_name,
                    &title,
                    &summary,
                )
                .await?;
        }

        let automation = &self.layout.automation;
        let automation_token = self.tokens.get(&automation.owner, &automation.name).await?;
        for partition in &to_trigger {
            let mut inputs = BTreeMap::new();
            inputs.insert("architecture".to_string(), partition.clone());
            inputs.insert(
                "tag_git_workflow_run_id".to_string(),
                stage.upstream_run_id.to_string(),
            );

            let run = self
                .services
                .workflows
                .dispatch(
                    &automation_token,
                    &automation.owner,
                    &automation.name,
                    &self.layout.fan_out_workflow,
                    &self.layout.branch,
                    &inputs,
                )
                .await?;

            info!(
                %partition,
                run_id = run.id,
                upstream = stage.upstream_run_id,
                "Started fan-out run"
            );
            report.push_str(&format!(
                "The `{}` workflow run [was started]({}).\n",
                self.layout.fan_out_stage_name(partition),
                run.html_url
            ));
        }

        Ok(report)
    }
}
