//! Correlation codec
//!
//! Check-run text fields are the cascade's only durable state. Everything that
//! links one stage to the next is written and read here, so the rest of the
//! crate only deals with the typed fragments below. The formats are shared with
//! the CI workflow definitions and must stay byte-compatible.
//!
//! | Fragment | Field | Format |
//! |---|---|---|
//! | [`RunLink`] | `text` | `For details, see [this run](https://github.com/{owner}/{repo}/actions/runs/{id})` |
//! | [`TagSummary`] | `summary` | `Tag Git {version} @{sha}` |
//! | [`ArtifactsSummary`] | `title` | `Build Git {version} artifacts` |
//! | [`ArtifactsSummary`] | `summary` | `Build Git {version} artifacts from commit {sha} (tag-git run #{id})` |
//! | snapshot | `title`, `summary` | `Upload snapshot {tag}` |

use super::error::CascadeError;
use crate::github::RepoRef;
use regex::Regex;
use std::sync::OnceLock;

fn run_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"For details, see \[this run\]\(https://github\.com/([^/]+)/([^/]+)/actions/runs/(\d+)\)",
        )
        .expect("valid regex")
    })
}

fn tag_summary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Tag Git (\S+) @([0-9a-f]+)$").expect("valid regex"))
}

fn artifacts_summary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Build Git (\S+) artifacts from commit (\S+) \(tag-git run #(\d+)\)")
            .expect("valid regex")
    })
}

/// Link from a check-run to the workflow run that did the work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLink {
    pub repo: RepoRef,
    pub run_id: u64,
}

impl RunLink {
    pub fn encode(&self) -> String {
        format!(
            "For details, see [this run](https://github.com/{}/{}/actions/runs/{})",
            self.repo.owner, self.repo.name, self.run_id
        )
    }

    /// Extracts the link from a check-run's `text`, rejecting any repository
    /// other than `trusted`
    pub fn decode(text: &str, trusted: &RepoRef) -> Result<Self, CascadeError> {
        let caps = run_link_re()
            .captures(text)
            .ok_or_else(|| CascadeError::MalformedCorrelationData {
                fragment: "run link",
                input: text.to_string(),
            })?;

        let repo = RepoRef::new(&caps[1], &caps[2]);
        if &repo != trusted {
            return Err(CascadeError::UnexpectedProvenance {
                found: repo,
                expected: trusted.clone(),
            });
        }

        let run_id = caps[3]
            .parse()
            .map_err(|_| CascadeError::MalformedCorrelationData {
                fragment: "run link",
                input: text.to_string(),
            })?;

        Ok(Self { repo, run_id })
    }
}

/// Summary written by the first stage once it tagged a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSummary {
    pub version: String,
    pub commit_sha: String,
}

impl TagSummary {
    pub fn encode(&self) -> String {
        format!("Tag Git {} @{}", self.version, self.commit_sha)
    }

    pub fn decode(summary: &str) -> Option<Self> {
        let caps = tag_summary_re().captures(summary)?;
        Some(Self {
            version: caps[1].to_string(),
            commit_sha: caps[2].to_string(),
        })
    }
}

/// Title and summary of a fan-out check-run, tagged with its upstream run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactsSummary {
    pub version: String,
    pub commit_sha: String,
    pub upstream_run_id: u64,
}

impl ArtifactsSummary {
    pub fn title(&self) -> String {
        format!("Build Git {} artifacts", self.version)
    }

    pub fn encode(&self) -> String {
        format!(
            "Build Git {} artifacts from commit {} {}",
            self.version,
            self.commit_sha,
            upstream_tag(self.upstream_run_id)
        )
    }

    pub fn decode(summary: &str) -> Option<Self> {
        let caps = artifacts_summary_re().captures(summary)?;
        Some(Self {
            version: caps[1].to_string(),
            commit_sha: caps[2].to_string(),
            upstream_run_id: caps[3].parse().ok()?,
        })
    }
}

/// The suffix every fan-out summary carries for its upstream run
pub fn upstream_tag(upstream_run_id: u64) -> String {
    format!("(tag-git run #{})", upstream_run_id)
}

pub fn carries_upstream_tag(summary: &str, upstream_run_id: u64) -> bool {
    summary.ends_with(&upstream_tag(upstream_run_id))
}

pub fn snapshot_title(snapshot_tag: &str) -> String {
    format!("Upload snapshot {}", snapshot_tag)
}
