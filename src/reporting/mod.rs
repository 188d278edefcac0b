//! Status reporting surface consumed by presentation layers.
//!
//! The controller drives a [`StatusReporter`] through a job's lifecycle; it never
//! looks at how the callbacks are rendered.
//!
//! - [`bridge::ReporterBridge`]: moves callbacks onto a dedicated presentation thread
//! - [`console::ConsoleReporter`]: renders alignment rows and progress on stdout
//! - [`controls`]: run/cancel control state and progress-bar styling

pub mod bridge;
pub mod console;
pub mod controls;

use crate::models::GeneratedItem;
use std::fmt;

pub use bridge::ReporterBridge;
pub use console::ConsoleReporter;
pub use controls::{BarStyle, ControlState};

/// Why a job did not reach success
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    Cancelled,
    WorkerError(String),
}

/// State shown to the presentation layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Success,
    Failed(FailureReason),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => f.write_str("running"),
            JobStatus::Success => f.write_str("success"),
            JobStatus::Failed(FailureReason::Cancelled) => f.write_str("failed (cancelled)"),
            JobStatus::Failed(FailureReason::WorkerError(msg)) => {
                write!(f, "failed (worker error: {})", msg)
            }
        }
    }
}

/// Lifecycle callbacks, invoked from the controller's loop task in processing order
#[cfg_attr(test, mockall::automock)]
pub trait StatusReporter: Send + Sync {
    fn on_state_changed(&self, status: JobStatus);

    /// `current` designs received out of `max`
    fn on_progress(&self, current: usize, max: usize);

    fn on_item_appended(&self, item: &GeneratedItem);

    /// Called once per worker failure, before the Failed state change
    fn on_error(&self, message: &str);
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl StatusReporter for NullReporter {
    fn on_state_changed(&self, _status: JobStatus) {}
    fn on_progress(&self, _current: usize, _max: usize) {}
    fn on_item_appended(&self, _item: &GeneratedItem) {}
    fn on_error(&self, _message: &str) {}
}
