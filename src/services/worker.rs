use super::channel::{ChannelPoll, ResultChannel, ResultSender, result_channel};
use crate::models::{Design, Job};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Errors a generator can end with
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Stopped because the cancel signal was raised; not reported to the user
    #[error("Generation cancelled")]
    Cancelled,

    #[error("Generator reported: {0}")]
    Reported(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Generator exited with code {0}")]
    ExitStatus(i32),

    #[error("Unrecognized generator output: {0}")]
    InvalidOutput(String),

    #[error("Process error: {0}")]
    ProcessError(#[from] std::io::Error),

    #[error("Generator panicked: {0}")]
    Panicked(String),
}

/// Per-worker cancellation signal.
///
/// Raised by the controller through [`WorkerHandle::request_cancel`]. Dropping the
/// handle also counts as cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&mut self) {
        // Err means the sender is gone, which we treat the same way
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// The opaque generation computation.
///
/// Implementations push designs onto `sink` in whatever order they finish and
/// should stop promptly once `cancel` fires or a send returns
/// [`ChannelClosed`](super::channel::ChannelClosed).
pub trait DesignGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        job: Job,
        sink: ResultSender,
        cancel: CancelSignal,
    ) -> impl Future<Output = Result<(), GenerationError>> + Send;
}

/// How a worker's task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    Finished,
    /// The task panicked or was aborted
    Crashed(String),
}

/// One running unit of generation work
pub struct WorkerHandle {
    epoch: u64,
    channel: ResultChannel,
    cancel_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn `generator` for `job` on the current tokio runtime
    pub fn start<G: DesignGenerator>(
        generator: Arc<G>,
        job: Job,
        epoch: u64,
        capacity: usize,
    ) -> Self {
        let (sender, channel) = result_channel(epoch, capacity);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let cancel = CancelSignal { rx: cancel_rx };
        let failure_sink = sender.clone();

        let join = tokio::spawn(async move {
            tracing::debug!(epoch, "Worker started for {} designs", job.design_count());

            match generator.generate(job, sender, cancel).await {
                Ok(()) => tracing::debug!(epoch, "Worker finished"),
                Err(GenerationError::Cancelled) => tracing::debug!(epoch, "Worker cancelled"),
                Err(e) => {
                    tracing::warn!(epoch, "Worker failed: {}", e);
                    if failure_sink.send_failure(e.to_string()).await.is_err() {
                        tracing::debug!(epoch, "Failure not delivered, channel already closed");
                    }
                }
            }
        });

        Self {
            epoch,
            channel,
            cancel_tx,
            join,
        }
    }

    /// Next message, or [`ChannelPoll::TimedOut`] after `timeout`
    pub async fn poll(&mut self, timeout: Duration) -> ChannelPoll {
        self.channel.recv_timeout(timeout).await
    }

    /// Ask the worker to stop. Idempotent.
    pub fn request_cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancel_requested(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Close the channel, discard undelivered messages and join the worker.
    ///
    /// A worker that has not been cancelled gets `grace` to exit on its own.
    pub async fn await_termination(mut self, grace: Duration) -> WorkerExit {
        let discarded = self.channel.close_and_drain();
        if discarded > 0 {
            tracing::debug!(epoch = self.epoch, "Discarded {} undelivered messages", discarded);
        }

        let joined = if self.is_cancel_requested() {
            (&mut self.join).await
        } else {
            match tokio::time::timeout(grace, &mut self.join).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(
                        epoch = self.epoch,
                        "Worker still running {:?} after its last design - cancelling",
                        grace
                    );
                    self.request_cancel();
                    (&mut self.join).await
                }
            }
        };

        match joined {
            Ok(()) => WorkerExit::Finished,
            Err(e) => {
                tracing::error!(epoch = self.epoch, "Worker join error: {}", e);
                WorkerExit::Crashed(e.to_string())
            }
        }
    }
}

type DesignFn = dyn Fn(&Job, usize) -> Result<Design, GenerationError> + Send + Sync;

/// Runs a blocking per-design computation on tokio's blocking pool.
///
/// The closure receives the job and the zero-based design index. The cancel
/// signal is checked between designs.
#[derive(Clone)]
pub struct ThreadedGenerator {
    design_fn: Arc<DesignFn>,
}

impl ThreadedGenerator {
    pub fn new<F>(design_fn: F) -> Self
    where
        F: Fn(&Job, usize) -> Result<Design, GenerationError> + Send + Sync + 'static,
    {
        Self {
            design_fn: Arc::new(design_fn),
        }
    }
}

impl DesignGenerator for ThreadedGenerator {
    async fn generate(
        &self,
        job: Job,
        sink: ResultSender,
        cancel: CancelSignal,
    ) -> Result<(), GenerationError> {
        let design_fn = Arc::clone(&self.design_fn);

        tokio::task::spawn_blocking(move || {
            for index in 0..job.design_count() {
                if cancel.is_cancelled() {
                    return Err(GenerationError::Cancelled);
                }
                // Nobody is listening any more; skip the remaining work
                if sink.is_closed() {
                    return Ok(());
                }
                let design = design_fn(&job, index)?;
                if sink.blocking_send(design).is_err() {
                    // Controller stopped listening
                    return Ok(());
                }
            }
            Ok(())
        })
        .await
        .map_err(|e| GenerationError::Panicked(e.to_string()))?
    }
}
