//! Shared fixtures for integration tests: a scripted generator and a reporter
//! that records every callback.

#![allow(dead_code)]

use design_runner::models::{Design, GeneratedItem, Job, OrchestratorSettings};
use design_runner::reporting::{JobStatus, StatusReporter};
use design_runner::services::{CancelSignal, DesignGenerator, GenerationError, ResultSender};
use design_runner::state::{JobOutcome, StateChange};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

pub const TARGET: &str = "MKV--LA";

pub fn job(count: usize) -> Job {
    Job::new(TARGET, count).unwrap()
}

/// Fast polling so tests finish quickly
pub fn fast_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        poll_interval_ms: 20,
        channel_capacity: 4,
        termination_grace_ms: 500,
    }
}

/// One step of a scripted worker
#[derive(Debug, Clone)]
pub enum Step {
    Emit(Design),
    /// Sleep, returning early as cancelled if the signal fires
    Sleep(Duration),
    /// Sleep without looking at the cancel signal
    Pause(Duration),
    /// End with a reported error
    Fail(String),
    /// Block until cancelled
    Hang,
    /// Return Ok without producing the rest
    Exit,
}

pub fn emit(sequence: &str) -> Step {
    Step::Emit(Design::new(sequence))
}

#[derive(Default)]
struct ScriptState {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    started: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

/// Generator that plays one script per job, in submission order.
///
/// Jobs beyond the queued scripts emit `design_count` designs immediately.
/// Clones share scripts and counters, so a test can keep one after handing
/// another to the controller.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    inner: Arc<ScriptState>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_script(&self, steps: Vec<Step>) {
        self.inner.scripts.lock().unwrap().push_back(steps);
    }

    pub fn started(&self) -> usize {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Highest number of workers ever running at once
    pub fn max_active(&self) -> usize {
        self.inner.max_active.load(Ordering::SeqCst)
    }

    fn next_script(&self, job: &Job) -> Vec<Step> {
        self.inner.scripts.lock().unwrap().pop_front().unwrap_or_else(|| {
            (0..job.design_count())
                .map(|i| emit(&job.target().as_str().replace('-', &(i % 10).to_string())))
                .collect()
        })
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DesignGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        job: Job,
        sink: ResultSender,
        mut cancel: CancelSignal,
    ) -> Result<(), GenerationError> {
        let script = self.next_script(&job);

        let state = &self.inner;
        state.started.fetch_add(1, Ordering::SeqCst);
        let now = state.active.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_active.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(&state.active);

        for step in script {
            match step {
                Step::Emit(design) => {
                    if sink.send(design).await.is_err() {
                        return Ok(());
                    }
                }
                Step::Sleep(duration) => {
                    tokio::select! {
                        _ = tokio::time::sleep(duration) => {}
                        _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                    }
                }
                Step::Pause(duration) => tokio::time::sleep(duration).await,
                Step::Fail(message) => return Err(GenerationError::Reported(message)),
                Step::Hang => {
                    cancel.cancelled().await;
                    return Err(GenerationError::Cancelled);
                }
                Step::Exit => return Ok(()),
            }
        }
        Ok(())
    }
}

/// Everything a reporter was told, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    State(JobStatus),
    Progress(usize, usize),
    Item(GeneratedItem),
    Error(String),
}

#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<JobStatus> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::State(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl StatusReporter for RecordingReporter {
    fn on_state_changed(&self, status: JobStatus) {
        self.push(Event::State(status));
    }

    fn on_progress(&self, current: usize, max: usize) {
        self.push(Event::Progress(current, max));
    }

    fn on_item_appended(&self, item: &GeneratedItem) {
        self.push(Event::Item(item.clone()));
    }

    fn on_error(&self, message: &str) {
        self.push(Event::Error(message.to_string()));
    }
}

/// Forwards to a [`RecordingReporter`] after sleeping in every callback
pub struct SlowReporter {
    pub inner: Arc<RecordingReporter>,
    pub delay: Duration,
}

impl StatusReporter for SlowReporter {
    fn on_state_changed(&self, status: JobStatus) {
        std::thread::sleep(self.delay);
        self.inner.on_state_changed(status);
    }

    fn on_progress(&self, current: usize, max: usize) {
        std::thread::sleep(self.delay);
        self.inner.on_progress(current, max);
    }

    fn on_item_appended(&self, item: &GeneratedItem) {
        std::thread::sleep(self.delay);
        self.inner.on_item_appended(item);
    }

    fn on_error(&self, message: &str) {
        std::thread::sleep(self.delay);
        self.inner.on_error(message);
    }
}

/// Wait for the next JobFinished event
pub async fn wait_finished(rx: &mut broadcast::Receiver<StateChange>) -> (u64, JobOutcome) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(StateChange::JobFinished { epoch, outcome }) => return (epoch, outcome),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("state channel closed"),
            }
        }
    })
    .await
    .expect("Timeout waiting for job to finish")
}

/// Wait until the running job has appended `count` designs
pub async fn wait_designs(rx: &mut broadcast::Receiver<StateChange>, count: usize) {
    let last_id = count + 1;
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(StateChange::ItemAppended { id, .. }) if id >= last_id => return,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("state channel closed"),
            }
        }
    })
    .await
    .expect("Timeout waiting for designs");
}
