// ReporterBridge - Moves reporter callbacks off the controller task
//
// The controller calls its reporter inline, from the loop task. Presentation code
// (terminal output, a GUI event loop) should not run there, so the bridge queues
// each callback as an owned event and replays it on a dedicated thread.
//
// State, error and item events are always delivered, in order; a job has at most
// MAX_DESIGN_COUNT + 2 items, which bounds the queue. Progress events are the only
// ones that may be skipped: when the presentation thread falls behind by more than
// `progress_backlog` events, further progress updates are dropped and counted. The
// next one delivered carries the current count anyway.

use super::{JobStatus, StatusReporter};
use crate::metrics::Metrics;
use crate::models::GeneratedItem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// Owned copy of one reporter callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    StateChanged(JobStatus),
    Progress { current: usize, max: usize },
    ItemAppended(GeneratedItem),
    Error(String),
}

impl ReportEvent {
    /// Only progress may be dropped under backpressure
    fn is_droppable(&self) -> bool {
        matches!(self, ReportEvent::Progress { .. })
    }

    fn replay(self, reporter: &dyn StatusReporter) {
        match self {
            ReportEvent::StateChanged(status) => reporter.on_state_changed(status),
            ReportEvent::Progress { current, max } => reporter.on_progress(current, max),
            ReportEvent::ItemAppended(item) => reporter.on_item_appended(&item),
            ReportEvent::Error(message) => reporter.on_error(&message),
        }
    }
}

/// [`StatusReporter`] that replays callbacks on a presentation thread
///
/// # Example
/// ```ignore
/// let metrics = Arc::new(Metrics::new());
/// let bridge = ReporterBridge::new(ConsoleReporter::new(), 1024, metrics.clone());
/// let controller = JobController::spawn(generator, Arc::new(bridge), settings, metrics);
/// ```
pub struct ReporterBridge {
    tx: mpsc::UnboundedSender<ReportEvent>,

    /// Events queued but not yet picked up by the presentation thread
    backlog: Arc<AtomicUsize>,

    /// Backlog at which progress events start being dropped
    progress_backlog: usize,

    metrics: Arc<Metrics>,

    /// Presentation thread; finishes once every sender is dropped
    thread: Option<JoinHandle<()>>,
}

impl ReporterBridge {
    pub fn new<R>(inner: R, progress_backlog: usize, metrics: Arc<Metrics>) -> Self
    where
        R: StatusReporter + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<ReportEvent>();
        let backlog = Arc::new(AtomicUsize::new(0));
        let thread_backlog = Arc::clone(&backlog);

        let thread = std::thread::Builder::new()
            .name("design-runner-report".to_string())
            .spawn(move || {
                tracing::debug!("Reporter bridge thread started");
                while let Some(event) = rx.blocking_recv() {
                    thread_backlog.fetch_sub(1, Ordering::SeqCst);
                    event.replay(&inner);
                }
                tracing::debug!("Reporter bridge thread terminated");
            })
            .map_err(|e| tracing::error!("Failed to start reporter bridge thread: {}", e))
            .ok();

        Self {
            tx,
            backlog,
            progress_backlog: progress_backlog.max(1),
            metrics,
            thread,
        }
    }

    fn forward(&self, event: ReportEvent) {
        if event.is_droppable() && self.backlog.load(Ordering::SeqCst) >= self.progress_backlog {
            self.metrics.record_report_dropped();
            tracing::trace!("Presentation thread behind - skipping progress update");
            return;
        }

        self.backlog.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(event).is_err() {
            self.backlog.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("Failed to forward report - bridge thread has stopped");
        }
    }

    /// Stop accepting events and wait for the presentation thread to drain the queue
    pub fn close(mut self) {
        let thread = self.thread.take();
        drop(self);
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::error!("Reporter bridge thread panicked");
            }
        }
    }
}

impl StatusReporter for ReporterBridge {
    fn on_state_changed(&self, status: JobStatus) {
        self.forward(ReportEvent::StateChanged(status));
    }

    fn on_progress(&self, current: usize, max: usize) {
        self.forward(ReportEvent::Progress { current, max });
    }

    fn on_item_appended(&self, item: &GeneratedItem) {
        self.forward(ReportEvent::ItemAppended(item.clone()));
    }

    fn on_error(&self, message: &str) {
        self.forward(ReportEvent::Error(message.to_string()));
    }
}
