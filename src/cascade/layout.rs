use crate::github::RepoRef;

/// Names, repositories and partitions that make up the cascading pipeline
///
/// `tag-git` runs in the automation repository and reports back to a check-run
/// on the origin repository. Its success fans out into one `git-artifacts-<arch>`
/// run per partition, and once all of those succeed `upload-snapshot` publishes
/// the result to the snapshots repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineLayout {
    /// Repository whose check-runs drive the cascade
    pub origin: RepoRef,
    /// Repository hosting the workflows; the only trusted run provenance
    pub automation: RepoRef,
    /// Repository the final stage publishes releases to
    pub snapshots: RepoRef,
    /// Branch workflows are dispatched on and commits must be reachable from
    pub branch: String,
    pub first_stage: String,
    pub fan_out_prefix: String,
    pub fan_out_workflow: String,
    pub join_stage: String,
    pub join_workflow: String,
    /// Fixed, ordered fan-out partition set
    pub partitions: Vec<String>,
}

impl Default for PipelineLayout {
    fn default() -> Self {
        Self {
            origin: RepoRef::new("git-for-windows", "git"),
            automation: RepoRef::new("git-for-windows", "git-for-windows-automation"),
            snapshots: RepoRef::new("git-for-windows", "git-snapshots"),
            branch: "main".to_string(),
            first_stage: "tag-git".to_string(),
            fan_out_prefix: "git-artifacts-".to_string(),
            fan_out_workflow: "git-artifacts.yml".to_string(),
            join_stage: "upload-snapshot".to_string(),
            join_workflow: "upload-snapshot.yml".to_string(),
            partitions: vec![
                "x86_64".to_string(),
                "i686".to_string(),
                "aarch64".to_string(),
            ],
        }
    }
}

impl PipelineLayout {
    pub fn fan_out_stage_name(&self, partition: &str) -> String {
        format!("{}{}", self.fan_out_prefix, partition)
    }

    /// Fan-out partition named by a workflow, if it belongs to the fan-out stage
    pub fn partition_of<'n>(&self, workflow_name: &'n str) -> Option<&'n str> {
        workflow_name
            .strip_prefix(self.fan_out_prefix.as_str())
            .filter(|p| !p.is_empty())
    }

    pub fn snapshot_tag(&self, version: &str) -> String {
        format!("prerelease-{}", version.strip_prefix('v').unwrap_or(version))
    }

    pub fn snapshot_release_url(&self, tag: &str) -> String {
        format!("https://github.com/{}/releases/tags/{}", self.snapshots, tag)
    }

    /// Dispatch input carrying a partition's workflow run ID to the final stage
    pub fn join_input_name(&self, partition: &str) -> String {
        format!("git_artifacts_{}_workflow_run_id", partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_partitions_are_ordered() {
        let layout = PipelineLayout::default();
        assert_eq!(layout.partitions, vec!["x86_64", "i686", "aarch64"]);
        assert_eq!(layout.fan_out_stage_name("i686"), "git-artifacts-i686");
    }

    #[test]
    fn test_partition_of() {
        let layout = PipelineLayout::default();
        assert_eq!(layout.partition_of("git-artifacts-aarch64"), Some("aarch64"));
        assert_eq!(layout.partition_of("git-artifacts-"), None);
        assert_eq!(layout.partition_of("tag-git"), None);
    }

    #[test]
    fn test_snapshot_tag_strips_single_leading_v() {
        let layout = PipelineLayout::default();
        assert_eq!(layout.snapshot_tag("v2.45.0.windows.1"), "prerelease-2.45.0.windows.1");
        assert_eq!(layout.snapshot_tag("2.45.0"), "prerelease-2.45.0");
        assert_eq!(layout.snapshot_tag("vv1"), "prerelease-v1");
    }

    #[test]
    fn test_snapshot_release_url() {
        let layout = PipelineLayout::default();
        assert_eq!(
            layout.snapshot_release_url("prerelease-1.2.3"),
            "https://github.com/git-for-windows/git-snapshots/releases/tags/prerelease-1.2.3"
        );
        assert_eq!(
            layout.join_input_name("x86_64"),
            "git_artifacts_x86_64_workflow_run_id"
        );
    }
}
