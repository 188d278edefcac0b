// State management module
//
// StateManager wraps the controller-owned state (job state, epoch, result list)
// behind Arc<RwLock<T>> and emits change events. Only the controller loop mutates
// it; everyone else reads snapshots or subscribes.

use crate::models::{Design, GeneratedItem, Job, ResultList};
use crate::reporting::{FailureReason, JobStatus};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

const EVENT_BUFFER: usize = 1024;

/// Controller lifecycle state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JobState {
    #[default]
    Idle,
    Running,
    Finalizing,
}

/// How a job ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Cancelled,
    Failed(String),
}

impl JobOutcome {
    /// Terminal status as reported to presentation
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Success => JobStatus::Success,
            JobOutcome::Cancelled => JobStatus::Failed(FailureReason::Cancelled),
            JobOutcome::Failed(msg) => JobStatus::Failed(FailureReason::WorkerError(msg.clone())),
        }
    }
}

/// Everything the controller owns about the current (or last) job
#[derive(Clone, Debug, Default)]
pub struct ControllerState {
    pub job_state: JobState,

    /// Epoch of the current or most recent job; 0 before the first job
    pub epoch: u64,

    pub design_count: usize,
    pub results: ResultList,
    pub last_outcome: Option<JobOutcome>,
}

/// Change events emitted when controller state is modified
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateChange {
    /// The result list was reset to the seed rows for a new job
    ResultsReset { epoch: u64, design_count: usize },

    /// A design was appended
    ItemAppended { epoch: u64, id: usize },

    /// A job reached its terminal state
    JobFinished { epoch: u64, outcome: JobOutcome },

    StateChanged { epoch: u64, state: JobState },
}

/// Cheap summary used to detect what an update changed without cloning the result list
#[derive(Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    job_state: JobState,
    epoch: u64,
    results_len: usize,
    has_outcome: bool,
}

impl Fingerprint {
    fn of(state: &ControllerState) -> Self {
        Self {
            job_state: state.job_state,
            epoch: state.epoch,
            results_len: state.results.len(),
            has_outcome: state.last_outcome.is_some(),
        }
    }
}

/// Thread-safe controller state with event emission
///
/// - [`read()`](Self::read) / [`results()`](Self::results) for readers
/// - job lifecycle methods for the controller loop
/// - [`subscribe()`](Self::subscribe) for listening to changes
#[derive(Clone)]
pub struct StateManager {
    state: Arc<RwLock<ControllerState>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            state: Arc::new(RwLock::new(ControllerState::default())),
            state_tx,
        }
    }

    /// Clone of the full state, result list included
    pub fn snapshot(&self) -> ControllerState {
        self.read(|state| state.clone())
    }

    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ControllerState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub fn job_state(&self) -> JobState {
        self.read(|state| state.job_state)
    }

    pub fn results(&self) -> Vec<GeneratedItem> {
        self.read(|state| state.results.items().to_vec())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Apply `update_fn` and emit the resulting change events
    fn update<F, R>(&self, update_fn: F) -> (R, Vec<StateChange>)
    where
        F: FnOnce(&mut ControllerState) -> R,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let before = Fingerprint::of(&state);

        let result = update_fn(&mut state);

        let changes = Self::detect_changes(before, &state);
        for change in &changes {
            // No subscribers is fine
            let _ = self.state_tx.send(change.clone());
        }

        (result, changes)
    }

    fn detect_changes(before: Fingerprint, state: &ControllerState) -> Vec<StateChange> {
        let after = Fingerprint::of(state);
        let mut changes = Vec::new();

        if before.epoch != after.epoch {
            changes.push(StateChange::ResultsReset {
                epoch: state.epoch,
                design_count: state.design_count,
            });
        } else if after.results_len > before.results_len {
            for id in before.results_len..after.results_len {
                changes.push(StateChange::ItemAppended {
                    epoch: state.epoch,
                    id,
                });
            }
        }

        if !before.has_outcome && after.has_outcome {
            if let Some(outcome) = &state.last_outcome {
                changes.push(StateChange::JobFinished {
                    epoch: state.epoch,
                    outcome: outcome.clone(),
                });
            }
        }

        if before.job_state != after.job_state {
            changes.push(StateChange::StateChanged {
                epoch: state.epoch,
                state: after.job_state,
            });
        }

        changes
    }

    /// Enter Running for `job` under `epoch` and reset the result list to the seeds
    pub fn begin_job(&self, epoch: u64, job: &Job) -> Vec<StateChange> {
        self.update(|state| {
            state.epoch = epoch;
            state.design_count = job.design_count();
            state.results = ResultList::seeded(job);
            state.last_outcome = None;
            state.job_state = JobState::Running;
        })
        .1
    }

    /// Append `design` if `epoch` is the running job; stale arrivals return `None`
    pub fn append_design(&self, epoch: u64, design: Design) -> Option<GeneratedItem> {
        self.update(|state| {
            if state.epoch != epoch || state.job_state != JobState::Running {
                return None;
            }
            Some(state.results.push_design(design).clone())
        })
        .0
    }

    pub fn begin_finalizing(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.job_state = JobState::Finalizing;
        })
        .1
    }

    /// Record the outcome and return to Idle
    pub fn finish_job(&self, outcome: JobOutcome) -> Vec<StateChange> {
        self.update(|state| {
            state.last_outcome = Some(outcome);
            state.job_state = JobState::Idle;
        })
        .1
    }

    /// Designs received by the current job, seeds excluded
    pub fn design_len(&self) -> usize {
        self.read(|state| state.results.design_len())
    }

    /// Whether the current job has every design it asked for
    pub fn is_complete(&self) -> bool {
        self.read(|state| state.results.design_len() >= state.design_count)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
