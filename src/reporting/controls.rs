// Run control glue
//
// Maps controller activity onto the single run/cancel button and the progress
// bar style. The presentation layer owns the widgets; this module only decides
// what they should say and what a click does.

use super::JobStatus;
use crate::controller::JobController;
use crate::models::Job;
use crate::services::DesignGenerator;

/// The run button doubles as the cancel button while a job is active
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlState {
    /// Idle: clicking starts a new job
    Enabled,
    /// Running: clicking cancels
    Disabled,
}

impl ControlState {
    pub fn description(&self) -> &'static str {
        match self {
            ControlState::Enabled => "Run ProteinSolver!",
            ControlState::Disabled => "Cancel",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ControlState::Enabled => "check",
            ControlState::Disabled => "ban",
        }
    }

    pub fn button_style(&self) -> &'static str {
        match self {
            ControlState::Enabled => "",
            ControlState::Disabled => "danger",
        }
    }

    pub fn tooltip(&self) -> &'static str {
        match self {
            ControlState::Enabled => "Generate new sequences!",
            ControlState::Disabled => "Cancel!",
        }
    }

    /// Button state implied by a status callback
    pub fn for_status(status: &JobStatus) -> Self {
        if status.is_terminal() {
            ControlState::Enabled
        } else {
            ControlState::Disabled
        }
    }
}

/// Progress bar style
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarStyle {
    Plain,
    Success,
    Danger,
}

impl BarStyle {
    /// Cancellation and worker errors share the danger style
    pub fn for_status(status: &JobStatus) -> Self {
        match status {
            JobStatus::Running => BarStyle::Plain,
            JobStatus::Success => BarStyle::Success,
            JobStatus::Failed(_) => BarStyle::Danger,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BarStyle::Plain => "",
            BarStyle::Success => "success",
            BarStyle::Danger => "danger",
        }
    }
}

/// Handle a click on the run button and return the state to show next.
///
/// From `Enabled` the click supersedes whatever is running with `job`; from
/// `Disabled` it only cancels.
pub fn on_run_control_clicked<G: DesignGenerator>(
    controller: &JobController<G>,
    state: ControlState,
    job: Job,
) -> ControlState {
    match state {
        ControlState::Enabled => {
            controller.cancel();
            controller.submit(job);
            ControlState::Disabled
        }
        ControlState::Disabled => {
            controller.cancel();
            ControlState::Enabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::FailureReason;

    #[test]
    fn test_button_mapping() {
        assert_eq!(ControlState::Enabled.description(), "Run ProteinSolver!");
        assert_eq!(ControlState::Enabled.icon(), "check");
        assert_eq!(ControlState::Disabled.description(), "Cancel");
        assert_eq!(ControlState::Disabled.button_style(), "danger");
        assert_eq!(ControlState::Disabled.tooltip(), "Cancel!");
    }

    #[test]
    fn test_control_follows_status() {
        assert_eq!(
            ControlState::for_status(&JobStatus::Running),
            ControlState::Disabled
        );
        assert_eq!(
            ControlState::for_status(&JobStatus::Failed(FailureReason::Cancelled)),
            ControlState::Enabled
        );
    }

    #[test]
    fn test_bar_style() {
        assert_eq!(BarStyle::for_status(&JobStatus::Running).as_str(), "");
        assert_eq!(BarStyle::for_status(&JobStatus::Success).as_str(), "success");
        assert_eq!(
            BarStyle::for_status(&JobStatus::Failed(FailureReason::WorkerError(
                "x".to_string()
            ))),
            BarStyle::Danger
        );
    }
}
