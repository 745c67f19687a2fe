//! Stage resolution
//!
//! Turns a completed check-run into a typed [`StageDescriptor`] by decoding its
//! text fields. Stages are expected to produce machine-parseable output, so any
//! deviation is surfaced as an error instead of being guessed around.

use super::correlation::{ArtifactsSummary, RunLink, TagSummary};
use super::error::CascadeError;
use super::layout::PipelineLayout;
use crate::github::{CheckRun, Conclusion};
use serde::Serialize;

/// What a completed check-run means for the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// The single-run stage whose success fans out
    FirstStage,
    /// One partition of the fanned-out stage
    FanOutMember,
    /// Anything the cascade does not react to
    Unrelated,
}

/// Identity and provenance of a stage invocation, recovered from text fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDescriptor {
    pub workflow_name: String,
    pub commit_sha: String,
    /// Workflow run ID downstream check-runs are tagged with: the first stage's
    /// own run for the first stage, the run that triggered it for a member
    pub upstream_run_id: u64,
    pub version: String,
    /// Present only for fan-out members
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
}

pub struct StageResolver<'a> {
    layout: &'a PipelineLayout,
}

impl<'a> StageResolver<'a> {
    pub fn new(layout: &'a PipelineLayout) -> Self {
        Self { layout }
    }

    pub fn classify(&self, workflow_name: &str) -> StageKind {
        if workflow_name == self.layout.first_stage {
            StageKind::FirstStage
        } else if self.layout.partition_of(workflow_name).is_some() {
            StageKind::FanOutMember
        } else {
            StageKind::Unrelated
        }
    }

    /// Resolves any run the cascade reacts to; `None` for unrelated workflows
    pub fn resolve(&self, run: &CheckRun) -> Result<Option<StageDescriptor>, CascadeError> {
        match self.classify(&run.name) {
            StageKind::FirstStage => self.resolve_first_stage(run).map(Some),
            StageKind::FanOutMember => self.resolve_fan_out_member(run).map(Some),
            StageKind::Unrelated => Ok(None),
        }
    }

    pub fn resolve_first_stage(&self, run: &CheckRun) -> Result<StageDescriptor, CascadeError> {
        if run.conclusion != Some(Conclusion::Success) {
            return Err(CascadeError::UpstreamStageFailed {
                stage: run.name.clone(),
                run_id: run.id,
                conclusion: run
                    .conclusion
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| run.status.to_string()),
                url: run.html_url.clone(),
            });
        }

        let link = RunLink::decode(run.output.text(), &self.layout.automation)?;

        let summary = run.output.summary();
        let tag = TagSummary::decode(summary).ok_or_else(|| CascadeError::MalformedStageOutput {
            stage: run.name.clone(),
            run_id: run.id,
            field: "Git version",
            input: summary.to_string(),
            url: run.reference_url().to_string(),
        })?;

        self.check_commit(run, &tag.commit_sha)?;

        Ok(StageDescriptor {
            workflow_name: run.name.clone(),
            commit_sha: tag.commit_sha,
            upstream_run_id: link.run_id,
            version: tag.version,
            partition: None,
        })
    }

    /// Resolves a fan-out member without judging its conclusion; the join
    /// evaluates every partition's outcome together
    pub fn resolve_fan_out_member(
        &self,
        run: &CheckRun,
    ) -> Result<StageDescriptor, CascadeError> {
        let summary = run.output.summary();
        let artifacts =
            ArtifactsSummary::decode(summary).ok_or_else(|| CascadeError::MalformedStageOutput {
                stage: run.name.clone(),
                run_id: run.id,
                field: "summary",
                input: summary.to_string(),
                url: run.reference_url().to_string(),
            })?;

        self.check_commit(run, &artifacts.commit_sha)?;

        Ok(StageDescriptor {
            workflow_name: run.name.clone(),
            commit_sha: artifacts.commit_sha,
            upstream_run_id: artifacts.upstream_run_id,
            version: artifacts.version,
            partition: self.layout.partition_of(&run.name).map(str::to_string),
        })
    }

    fn check_commit(&self, run: &CheckRun, recovered: &str) -> Result<(), CascadeError> {
        if run.head_sha != recovered {
            return Err(CascadeError::ProvenanceMismatch {
                stage: run.name.clone(),
                run_id: run.id,
                expected: run.head_sha.clone(),
                summary: run.output.summary().to_string(),
                url: run.reference_url().to_string(),
            });
        }
        Ok(())
    }
}
