use crate::github::{CheckRun, RepoRef};
use serde::{Deserialize, Serialize};

/// A `check_run` webhook delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunEvent {
    pub action: String,
    pub repository: Repository,
    pub check_run: CheckRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub owner: Owner,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

impl CheckRunEvent {
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.repository.owner.login, &self.repository.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_webhook_payload() {
        let payload = r#"{
            "action": "completed",
            "repository": { "name": "git", "owner": { "login": "git-for-windows" }, "private": false },
            "check_run": {
                "id": 1,
                "name": "tag-git",
                "head_sha": "abc123",
                "status": "completed",
                "conclusion": "success",
                "details_url": "https://github.com/git-for-windows/git-for-windows-automation/actions/runs/5",
                "html_url": "https://github.com/git-for-windows/git/runs/1",
                "output": { "title": "Tag Git", "summary": "Tag Git v1.2.3 @abc123", "text": "" }
            },
            "sender": { "login": "bot" }
        }"#;

        let event: CheckRunEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.action, "completed");
        assert_eq!(event.repo_ref(), RepoRef::new("git-for-windows", "git"));
        assert!(event.check_run.succeeded());
    }
}
