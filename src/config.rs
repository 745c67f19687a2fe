//! Configuration management for checkrun-cascade
//!
//! Settings are loaded from environment variables with defaults that match the
//! Git for Windows pipeline.
//!
//! # Environment Variables
//!
//! - `CASCADE_API_URL`: GitHub REST API base URL - default: "https://api.github.com"
//! - `GITHUB_TOKEN`: Token used for every repository - required for `handle`
//! - `CASCADE_REQUEST_TIMEOUT`: Timeout in seconds - default: "30"
//! - `CASCADE_LOG_LEVEL`: Logging level - default: "info"
//! - `CASCADE_OWNER`: Owner of all pipeline repositories - default: "git-for-windows"
//! - `CASCADE_REPO`: Repository whose check-runs drive the cascade - default: "git"
//! - `CASCADE_AUTOMATION_REPO`: Repository hosting the workflows - default: "git-for-windows-automation"
//! - `CASCADE_SNAPSHOTS_REPO`: Repository snapshots are published to - default: "git-snapshots"
//! - `CASCADE_BRANCH`: Dispatch branch - default: "main"
//!
//! # Example
//!
//! ```no_run
//! use checkrun_cascade::CascadeConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CascadeConfig::default();
//! config.validate()?;
//!
//! let orchestrator = config.create_orchestrator()?;
//! # Ok(())
//! # }
//! ```

use crate::cascade::{CascadeOrchestrator, PipelineLayout};
use crate::github::{
    ApiError, GitHubRestClient, GitHubServices, RepoRef, StaticTokenProvider, TokenCache,
    DEFAULT_API_URL,
};
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API token available
    #[error("GitHub token not specified. Set the GITHUB_TOKEN environment variable")]
    MissingToken,

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// HTTP client could not be built
    #[error("Client initialization failed: {0}")]
    ClientInitError(#[from] ApiError),
}

#[derive(Clone)]
pub struct CascadeConfig {
    /// GitHub REST API base URL
    pub api_url: String,

    pub token: Option<String>,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Repositories, stage names and partitions of the pipeline
    pub layout: PipelineLayout,
}

impl Default for CascadeConfig {
    /// Loads from `CASCADE_*` environment variables, falling back to defaults
    fn default() -> Self {
        let api_url = env::var("CASCADE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let token = env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());

        let request_timeout_secs = env::var("CASCADE_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let log_level = env::var("CASCADE_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let mut layout = PipelineLayout::default();
        let owner = env::var("CASCADE_OWNER").unwrap_or_else(|_| layout.origin.owner.clone());
        let repo_var = |key: &str, default: &RepoRef| {
            RepoRef::new(
                owner.clone(),
                env::var(key).unwrap_or_else(|_| default.name.clone()),
            )
        };
        layout.origin = repo_var("CASCADE_REPO", &layout.origin);
        layout.automation = repo_var("CASCADE_AUTOMATION_REPO", &layout.automation);
        layout.snapshots = repo_var("CASCADE_SNAPSHOTS_REPO", &layout.snapshots);
        if let Ok(branch) = env::var("CASCADE_BRANCH") {
            layout.branch = branch;
        }

        Self {
            api_url,
            token,
            request_timeout_secs,
            log_level,
            layout,
        }
    }
}

impl CascadeConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any validation fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ConfigError::ValidationFailed(format!(
                "API URL must be http(s): {}",
                self.api_url
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        for repo in [
            &self.layout.origin,
            &self.layout.automation,
            &self.layout.snapshots,
        ] {
            if repo.owner.is_empty() || repo.name.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Repository must be owner/name, got '{}'",
                    repo
                )));
            }
        }

        if self.layout.partitions.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "At least one fan-out partition is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Builds an orchestrator talking to the configured GitHub API
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingToken` without a token, or a client error
    /// if the HTTP client cannot be built.
    pub fn create_orchestrator(&self) -> Result<CascadeOrchestrator, ConfigError> {
        let token = self.token.clone().ok_or(ConfigError::MissingToken)?;

        let client = GitHubRestClient::new(
            self.api_url.clone(),
            Duration::from_secs(self.request_timeout_secs),
        )?;
        let tokens = TokenCache::new(Arc::new(StaticTokenProvider::new(Some(token))));

        Ok(CascadeOrchestrator::new(
            GitHubServices::from_single(Arc::new(client)),
            Arc::new(tokens),
            self.layout.clone(),
        ))
    }
}

impl fmt::Debug for CascadeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CascadeConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("log_level", &self.log_level)
            .field("layout", &self.layout)
            .finish()
    }
}

impl fmt::Display for CascadeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cascade Configuration:")?;
        writeln!(f, "  API URL: {}", self.api_url)?;
        writeln!(
            f,
            "  Token: {}",
            if self.token.is_some() { "set" } else { "not set" }
        )?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Origin: {}", self.layout.origin)?;
        writeln!(f, "  Automation: {}", self.layout.automation)?;
        writeln!(f, "  Snapshots: {}", self.layout.snapshots)?;
        writeln!(f, "  Branch: {}", self.layout.branch)?;
        writeln!(f, "  Partitions: {}", self.layout.partitions.join(", "))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn clear_env() -> Vec<EnvGuard> {
        [
            "CASCADE_API_URL",
            "GITHUB_TOKEN",
            "CASCADE_REQUEST_TIMEOUT",
            "CASCADE_LOG_LEVEL",
            "CASCADE_OWNER",
            "CASCADE_REPO",
            "CASCADE_AUTOMATION_REPO",
            "CASCADE_SNAPSHOTS_REPO",
            "CASCADE_BRANCH",
        ]
        .into_iter()
        .map(EnvGuard::unset)
        .collect()
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = clear_env();

        let config = CascadeConfig::default();

        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.token.is_none());
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.layout, PipelineLayout::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _cleared = clear_env();
        let _guards = vec![
            EnvGuard::set("CASCADE_API_URL", "https://ghe.example.com/api/v3"),
            EnvGuard::set("GITHUB_TOKEN", "ghs_secret"),
            EnvGuard::set("CASCADE_REQUEST_TIMEOUT", "60"),
            EnvGuard::set("CASCADE_LOG_LEVEL", "DEBUG"),
            EnvGuard::set("CASCADE_OWNER", "my-fork"),
            EnvGuard::set("CASCADE_SNAPSHOTS_REPO", "nightlies"),
            EnvGuard::set("CASCADE_BRANCH", "release"),
        ];

        let config = CascadeConfig::default();

        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.token.as_deref(), Some("ghs_secret"));
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.layout.origin, RepoRef::new("my-fork", "git"));
        assert_eq!(
            config.layout.automation,
            RepoRef::new("my-fork", "git-for-windows-automation")
        );
        assert_eq!(config.layout.snapshots, RepoRef::new("my-fork", "nightlies"));
        assert_eq!(config.layout.branch, "release");
    }

    #[test]
    #[serial]
    fn test_empty_token_is_ignored() {
        let _cleared = clear_env();
        let _guard = EnvGuard::set("GITHUB_TOKEN", "");
        assert!(CascadeConfig::default().token.is_none());
    }

    #[test]
    #[serial]
    fn test_configuration_validation_invalid_timeout() {
        let _cleared = clear_env();
        let mut config = CascadeConfig::default();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.request_timeout_secs = 601;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_configuration_validation_invalid_log_level() {
        let _cleared = clear_env();
        let mut config = CascadeConfig::default();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_configuration_validation_invalid_api_url() {
        let _cleared = clear_env();
        let mut config = CascadeConfig::default();
        config.api_url = "api.github.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_create_orchestrator_requires_token() {
        let _cleared = clear_env();
        let config = CascadeConfig::default();
        assert!(matches!(
            config.create_orchestrator(),
            Err(ConfigError::MissingToken)
        ));

        let config = CascadeConfig {
            token: Some("t".to_string()),
            ..config
        };
        let orchestrator = config.create_orchestrator().unwrap();
        assert_eq!(orchestrator.layout(), &config.layout);
    }

    #[test]
    #[serial]
    fn test_config_display_and_debug_hide_token() {
        let _cleared = clear_env();
        let config = CascadeConfig {
            token: Some("ghs_secret".to_string()),
            ..CascadeConfig::default()
        };

        let display = format!("{}", config);
        assert!(display.contains("Cascade Configuration:"));
        assert!(display.contains("Token: set"));
        assert!(!display.contains("ghs_secret"));

        let debug = format!("{:?}", config);
        assert!(!debug.contains("ghs_secret"));
    }
}
