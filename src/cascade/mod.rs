//! Check-run cascade engine
//!
//! Advances a multi-stage pipeline when a stage's check-run completes:
//!
//! 1. `tag-git` succeeds: [`FanOutDispatcher`] queues and dispatches one
//!    `git-artifacts-<arch>` run per partition that has none yet.
//! 2. A `git-artifacts-<arch>` run completes: [`FanInJoin`] checks whether every
//!    partition succeeded and, if so, starts `upload-snapshot`.
//!
//! There is no state store. All linkage lives in check-run text fields and is
//! handled by [`correlation`]; decisions are re-derived from the registry on
//! every event, which makes redelivery harmless.

pub mod correlation;
mod error;
mod event;
mod fan_in;
mod fan_out;
mod layout;
mod orchestrator;
mod stage;

pub use error::CascadeError;
pub use event::{CheckRunEvent, Owner, Repository};
pub use fan_in::{FanInJoin, JoinStatus};
pub use fan_out::{select_latest, FanOutDispatcher, PartitionState};
pub use layout::PipelineLayout;
pub use orchestrator::CascadeOrchestrator;
pub use stage::{StageDescriptor, StageKind, StageResolver};
