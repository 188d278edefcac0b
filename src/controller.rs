// Job controller - the orchestration loop
//
// One long-lived tokio task owns the job lifecycle:
// - waits (Notify, no polling) until a submission lands in the single pending slot
// - runs that job end to end: seeds, worker start, timed channel polls, finalize
// - returns to waiting
//
// Callers only ever touch the pending slot and the cancellation flag. The result
// list and job state are mutated exclusively from the loop task through the
// StateManager.

use crate::metrics::Metrics;
use crate::models::{GeneratedItem, Job, OrchestratorSettings, SEED_COUNT};
use crate::reporting::{JobStatus, StatusReporter};
use crate::services::channel::{ChannelPoll, Payload, WorkerMessage};
use crate::services::worker::{DesignGenerator, WorkerExit, WorkerHandle};
use crate::state::{JobOutcome, JobState, StateChange, StateManager};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;

/// Runs at most one design job at a time.
///
/// # Example
/// ```ignore
/// let controller = JobController::spawn(generator, reporter, settings, metrics);
/// controller.submit(Job::new("MKV--L", 5)?);
/// // later
/// controller.cancel();
/// controller.shutdown().await;
/// ```
pub struct JobController<G: DesignGenerator> {
    shared: Arc<Shared<G>>,
    loop_task: Option<JoinHandle<()>>,
}

struct Shared<G> {
    generator: Arc<G>,
    reporter: Arc<dyn StatusReporter>,
    settings: OrchestratorSettings,
    state: StateManager,
    metrics: Arc<Metrics>,

    /// Latest submission not yet started. Also guards clearing of the cancel flag.
    pending: Mutex<Option<Pending>>,

    /// Wakes the loop when a submission arrives or shutdown is requested
    wake: Notify,

    /// The cancellation flag; `true` means the running job should stop
    cancel_tx: watch::Sender<bool>,

    shutdown: AtomicBool,
}

/// A submission waiting for the loop to pick it up
struct Pending {
    job: Job,
    /// Cancelled before it started; the job still runs its seeds and ends Cancelled
    cancelled: bool,
}

impl<G: DesignGenerator> JobController<G> {
    /// Start the controller loop on the current tokio runtime
    pub fn spawn(
        generator: G,
        reporter: Arc<dyn StatusReporter>,
        settings: OrchestratorSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            generator: Arc::new(generator),
            reporter,
            settings,
            state: StateManager::new(),
            metrics,
            pending: Mutex::new(None),
            wake: Notify::new(),
            cancel_tx,
            shutdown: AtomicBool::new(false),
        });

        let loop_task = tokio::spawn(Arc::clone(&shared).run_loop());

        tracing::info!("Job controller started");

        Self {
            shared,
            loop_task: Some(loop_task),
        }
    }

    /// Queue `job`, superseding anything running or pending. Never blocks.
    pub fn submit(&self, job: Job) {
        tracing::info!("Job submitted: {} designs", job.design_count());
        {
            let mut pending = self
                .shared
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            // Raised under the slot lock so it cannot be cleared by a job start
            // that has not seen this submission yet
            self.shared.cancel_tx.send_replace(true);

            let next = Pending {
                job,
                cancelled: false,
            };
            if let Some(previous) = pending.replace(next) {
                self.shared.metrics.record_submission_superseded();
                tracing::info!(
                    "Pending job ({} designs) superseded before it started",
                    previous.job.design_count()
                );
            }
        }
        self.shared.wake.notify_one();
    }

    /// Ask the running job to stop. Idempotent; no effect while idle.
    ///
    /// Also applies to a submission the loop has not picked up yet.
    pub fn cancel(&self) {
        tracing::info!("Cancellation requested");
        let mut pending = self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(pending) = pending.as_mut() {
            tracing::debug!("Cancelling job that has not started yet");
            pending.cancelled = true;
        }
        self.shared.cancel_tx.send_replace(true);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.shared.is_cancel_requested()
    }

    pub fn state(&self) -> JobState {
        self.shared.state.job_state()
    }

    /// Snapshot of the current (or last) job's result list
    pub fn results(&self) -> Vec<GeneratedItem> {
        self.shared.state.results()
    }

    pub fn last_outcome(&self) -> Option<JobOutcome> {
        self.shared.state.read(|state| state.last_outcome.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.shared.state.subscribe()
    }

    pub fn state_manager(&self) -> &StateManager {
        &self.shared.state
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.shared.metrics
    }

    /// Cancel any running job, stop the loop and wait for it to exit.
    ///
    /// A submission still pending is never started.
    pub async fn shutdown(mut self) {
        self.shared.request_shutdown();
        if let Some(task) = self.loop_task.take() {
            if let Err(e) = task.await {
                tracing::error!("Controller loop join error: {}", e);
            }
        }
        tracing::info!("Job controller stopped");
    }
}

impl<G: DesignGenerator> Drop for JobController<G> {
    fn drop(&mut self) {
        if self.loop_task.is_some() {
            self.shared.request_shutdown();
        }
    }
}

impl<G: DesignGenerator> Shared<G> {
    fn is_cancel_requested(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.cancel_tx.send_replace(true);
        self.wake.notify_one();
    }

    async fn run_loop(self: Arc<Self>) {
        tracing::info!("Job controller loop waiting for submissions");
        let mut epoch = 0u64;

        while let Some(job) = self.next_submission().await {
            epoch += 1;
            self.run_job(job, epoch).await;
        }

        tracing::info!("Job controller loop exited");
    }

    async fn next_submission(&self) -> Option<Job> {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return None;
            }
            if let Some(job) = self.take_pending() {
                return Some(job);
            }
            // notify_one stores a permit, so a submit between the check and here is not lost
            self.wake.notified().await;
        }
    }

    /// Take the pending job and reset the cancel flag to its own, in one step
    fn take_pending(&self) -> Option<Job> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let Pending { job, cancelled } = pending.take()?;
        self.cancel_tx.send_replace(cancelled);
        Some(job)
    }

    async fn run_job(&self, job: Job, epoch: u64) -> JobOutcome {
        let started = Instant::now();
        let design_count = job.design_count();
        self.metrics.record_job_started();

        tracing::info!(
            epoch,
            "Starting job: {} designs for a {}-residue target ({} open positions)",
            design_count,
            job.target().len(),
            job.target().gap_count()
        );

        self.state.begin_job(epoch, &job);
        self.reporter.on_state_changed(JobStatus::Running);
        self.reporter.on_progress(0, design_count);
        for seed in self.state.results() {
            self.reporter.on_item_appended(&seed);
        }

        let mut worker = WorkerHandle::start(
            Arc::clone(&self.generator),
            job,
            epoch,
            self.settings.channel_capacity,
        );
        let poll_interval = self.settings.poll_interval();
        let mut outcome = JobOutcome::Success;

        while !self.state.is_complete() {
            if self.is_cancel_requested() {
                tracing::info!(
                    epoch,
                    "Cancellation observed after {} of {} designs",
                    self.state.design_len(),
                    design_count
                );
                worker.request_cancel();
                outcome = JobOutcome::Cancelled;
                break;
            }

            match worker.poll(poll_interval).await {
                ChannelPoll::TimedOut => continue,

                ChannelPoll::Message(message) if message.epoch != epoch => {
                    self.metrics.record_stale_item();
                    tracing::debug!(epoch, stale = message.epoch, "Dropped message from superseded worker");
                }

                ChannelPoll::Message(WorkerMessage {
                    payload: Payload::Design(design),
                    ..
                }) => match self.state.append_design(epoch, design) {
                    Some(item) => {
                        self.metrics.record_design();
                        self.reporter
                            .on_progress(item.id + 1 - SEED_COUNT, design_count);
                        self.reporter.on_item_appended(&item);
                    }
                    None => {
                        self.metrics.record_stale_item();
                        tracing::debug!(epoch, "Dropped design arriving outside its job");
                    }
                },

                ChannelPoll::Message(WorkerMessage {
                    payload: Payload::Failure(message),
                    ..
                }) => {
                    tracing::error!(epoch, "Encountered an exception: {}", message);
                    self.reporter.on_error(&message);
                    worker.request_cancel();
                    outcome = JobOutcome::Failed(message);
                    break;
                }

                ChannelPoll::Disconnected => {
                    let message = format!(
                        "Worker exited after producing {} of {} designs",
                        self.state.design_len(),
                        design_count
                    );
                    tracing::error!(epoch, "{}", message);
                    self.reporter.on_error(&message);
                    outcome = JobOutcome::Failed(message);
                    break;
                }
            }
        }

        self.state.begin_finalizing();
        if let WorkerExit::Crashed(reason) = worker
            .await_termination(self.settings.termination_grace())
            .await
        {
            tracing::warn!(epoch, "Worker did not exit cleanly: {}", reason);
        }

        let elapsed = started.elapsed();
        self.metrics.record_job_time(elapsed);
        match &outcome {
            JobOutcome::Success => self.metrics.record_job_succeeded(),
            JobOutcome::Cancelled => self.metrics.record_job_cancelled(),
            JobOutcome::Failed(_) => self.metrics.record_job_failed(),
        }

        tracing::info!(
            epoch,
            "Job finished in {:.2}s: {} ({} of {} designs)",
            elapsed.as_secs_f32(),
            outcome.status(),
            self.state.design_len(),
            design_count
        );

        // Terminal callback before the state flips to Idle, so anyone waiting on
        // JobFinished sees the reporter already up to date
        self.reporter.on_state_changed(outcome.status());
        self.state.finish_job(outcome.clone());

        outcome
    }
}
