//! checkrun-cascade - idempotent orchestration of multi-stage CI pipelines
//!
//! Reacts to GitHub `check_run` completion events and advances the pipeline to
//! its next stage exactly once, using nothing but the check-runs themselves as
//! durable state.
//!
//! # Core Concepts
//!
//! - **Stage**: one named unit of CI work backed by a workflow
//! - **Fan-out**: one upstream completion spawning one run per partition
//!   (target architecture)
//! - **Fan-in**: a final stage gated on every partition succeeding
//! - **Correlation tag**: text embedded in a check-run's summary or body that
//!   links it to the run that triggered it
//!
//! # Example Usage
//!
//! ```no_run
//! use checkrun_cascade::{CascadeConfig, CheckRunEvent};
//!
//! # async fn example(payload: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = CascadeConfig::default();
//! let orchestrator = config.create_orchestrator()?;
//!
//! let event: CheckRunEvent = serde_json::from_str(payload)?;
//! println!("{}", orchestrator.handle(&event).await?);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`cascade`]: correlation codec, stage resolution, fan-out, fan-in and the
//!   orchestrator
//! - [`github`]: capability traits, REST adapter, token cache and an in-memory
//!   mock
//! - [`config`]: environment-driven configuration
//! - [`cli`]: command-line front end

pub mod cascade;
pub mod cli;
pub mod config;
pub mod github;
pub mod util;

pub use cascade::{
    CascadeError, CascadeOrchestrator, CheckRunEvent, FanInJoin, FanOutDispatcher, PipelineLayout,
    StageDescriptor, StageResolver,
};
pub use config::{CascadeConfig, ConfigError};
pub use github::{ApiError, GitHubServices, MockGitHub, TokenCache};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
