//! Data models for design-runner.
//!
//! - [`Job`]: an immutable request for a batch of designs, validated at construction
//! - [`GeneratedItem`] / [`ResultList`]: the append-only rows of one job's results
//! - [`Design`]: what a worker produces before the controller assigns an id
//! - [`Settings`]: configuration loaded from `runner.yaml`

pub mod config;
pub mod item;
pub mod job;

pub use config::{GeneratorSettings, LoggingSettings, OrchestratorSettings, Settings};
pub use item::{Design, GeneratedItem, ResultList, SEED_COUNT};
pub use job::{Job, JobError, MAX_DESIGN_COUNT, ResidueSequence};
