use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a check-run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunStatus {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Requested,
    Pending,
    #[serde(other)]
    Unknown,
}

impl CheckRunStatus {
    pub fn is_completed(self) -> bool {
        self == CheckRunStatus::Completed
    }
}

impl fmt::Display for CheckRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckRunStatus::Queued => "queued",
            CheckRunStatus::InProgress => "in_progress",
            CheckRunStatus::Completed => "completed",
            CheckRunStatus::Waiting => "waiting",
            CheckRunStatus::Requested => "requested",
            CheckRunStatus::Pending => "pending",
            CheckRunStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Terminal conclusion of a completed check-run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    Stale,
    StartupFailure,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
            Conclusion::Neutral => "neutral",
            Conclusion::Cancelled => "cancelled",
            Conclusion::Skipped => "skipped",
            Conclusion::TimedOut => "timed_out",
            Conclusion::ActionRequired => "action_required",
            Conclusion::Stale => "stale",
            Conclusion::StartupFailure => "startup_failure",
            Conclusion::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Free-text output fields of a check-run
///
/// These are the only channel the cascade has for structured metadata, see
/// [`crate::cascade::correlation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunOutput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl CheckRunOutput {
    pub fn summary(&self) -> &str {
        self.summary.as_deref().unwrap_or_default()
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// A check-run as returned by the REST API and embedded in webhook payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    pub id: u64,
    pub name: String,
    pub head_sha: String,
    pub status: CheckRunStatus,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub details_url: Option<String>,
    #[serde(default)]
    pub html_url: String,
    /// API URL of the check-run
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub output: CheckRunOutput,
}

impl CheckRun {
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn succeeded(&self) -> bool {
        self.is_completed() && self.conclusion == Some(Conclusion::Success)
    }

    /// Best URL to show an operator: the API URL when known, else the web URL
    pub fn reference_url(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.html_url)
    }
}

/// A workflow run started through a dispatch request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub html_url: String,
}

/// Result of comparing two commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub ahead_by: u64,
    pub behind_by: u64,
}

/// An `owner/name` repository coordinate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_run_deserializes_webhook_shape() {
        let json = serde_json::json!({
            "id": 42,
            "name": "git-artifacts-x86_64",
            "head_sha": "abc123",
            "status": "in_progress",
            "conclusion": null,
            "html_url": "https://github.com/o/r/runs/42",
            "output": { "title": "t", "summary": "s", "text": null }
        });

        let run: CheckRun = serde_json::from_value(json).unwrap();
        assert_eq!(run.status, CheckRunStatus::InProgress);
        assert!(run.conclusion.is_none());
        assert_eq!(run.output.summary(), "s");
        assert_eq!(run.output.text(), "");
        assert!(!run.succeeded());
    }

    #[test]
    fn test_unknown_states_do_not_fail_parsing() {
        let status: CheckRunStatus = serde_json::from_str("\"brand_new_state\"").unwrap();
        assert_eq!(status, CheckRunStatus::Unknown);

        let conclusion: Conclusion = serde_json::from_str("\"surprise\"").unwrap();
        assert_eq!(conclusion, Conclusion::Unknown);
    }

    #[test]
    fn test_status_display_matches_wire_name() {
        for status in [
            CheckRunStatus::Queued,
            CheckRunStatus::InProgress,
            CheckRunStatus::Completed,
            CheckRunStatus::Waiting,
            CheckRunStatus::Requested,
            CheckRunStatus::Pending,
        ] {
            let wire = serde_json::to_string(&status).unwrap();
            assert_eq!(wire, format!("\"{}\"", status));
        }
        assert_eq!(CheckRunStatus::InProgress.to_string(), "in_progress");
    }

    #[test]
    fn test_conclusion_display_matches_wire_name() {
        assert_eq!(Conclusion::TimedOut.to_string(), "timed_out");
        let wire = serde_json::to_string(&Conclusion::TimedOut).unwrap();
        assert_eq!(wire, "\"timed_out\"");
    }

    #[test]
    fn test_reference_url_prefers_api_url() {
        let mut run = CheckRun {
            id: 1,
            name: "tag-git".to_string(),
            head_sha: "abc".to_string(),
            status: CheckRunStatus::Completed,
            conclusion: Some(Conclusion::Success),
            details_url: None,
            html_url: "https://github.com/o/r/runs/1".to_string(),
            url: None,
            output: CheckRunOutput::default(),
        };
        assert_eq!(run.reference_url(), "https://github.com/o/r/runs/1");

        run.url = Some("https://api.github.com/repos/o/r/check-runs/1".to_string());
        assert_eq!(
            run.reference_url(),
            "https://api.github.com/repos/o/r/check-runs/1"
        );
        assert!(run.succeeded());
    }

    #[test]
    fn test_repo_ref_display() {
        assert_eq!(RepoRef::new("git-for-windows", "git").to_string(), "git-for-windows/git");
    }
}
