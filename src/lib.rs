// design-runner - job orchestration for batched sequence design generation
//
// This is the library crate containing the controller loop, workers and reporting.
// The binary crate (main.rs) provides a line-oriented console front end.

pub mod config;
pub mod controller;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod reporting;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use controller::JobController;
pub use metrics::Metrics;
pub use models::{Design, GeneratedItem, Job, JobError, Settings};
pub use reporting::{FailureReason, JobStatus, StatusReporter};
pub use services::{DesignGenerator, ProcessGenerator, ThreadedGenerator};
pub use state::{JobOutcome, JobState, StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
