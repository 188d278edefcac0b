// Result channel between a worker and the controller loop
//
// Bounded FIFO over tokio mpsc. Every message carries the epoch of the job whose
// worker produced it, so the consumer can tell a stale arrival from a current one.

use crate::models::Design;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// The receiving side was closed; the worker should stop producing
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Result channel closed")]
pub struct ChannelClosed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Design(Design),
    /// Terminal error sentinel
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerMessage {
    pub epoch: u64,
    pub payload: Payload,
}

/// Result of one timed receive
#[derive(Debug, PartialEq, Eq)]
pub enum ChannelPoll {
    Message(WorkerMessage),
    TimedOut,
    /// Every sender is gone: the worker has exited
    Disconnected,
}

/// Create a channel for the worker of job `epoch`
pub fn result_channel(epoch: u64, capacity: usize) -> (ResultSender, ResultChannel) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ResultSender { tx, epoch }, ResultChannel { rx })
}

/// Producer half, handed to the generator
#[derive(Debug, Clone)]
pub struct ResultSender {
    tx: mpsc::Sender<WorkerMessage>,
    epoch: u64,
}

impl ResultSender {
    /// Queue a design, waiting for capacity if the buffer is full
    pub async fn send(&self, design: Design) -> Result<(), ChannelClosed> {
        self.tx
            .send(self.wrap(Payload::Design(design)))
            .await
            .map_err(|_| ChannelClosed)
    }

    /// Queue a design from a blocking thread.
    ///
    /// Must not be called from inside an async task.
    pub fn blocking_send(&self, design: Design) -> Result<(), ChannelClosed> {
        self.tx
            .blocking_send(self.wrap(Payload::Design(design)))
            .map_err(|_| ChannelClosed)
    }

    /// Queue the terminal error sentinel
    pub async fn send_failure(&self, message: impl Into<String>) -> Result<(), ChannelClosed> {
        self.tx
            .send(self.wrap(Payload::Failure(message.into())))
            .await
            .map_err(|_| ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn wrap(&self, payload: Payload) -> WorkerMessage {
        WorkerMessage {
            epoch: self.epoch,
            payload,
        }
    }
}

/// Consumer half, owned by the [`WorkerHandle`](super::worker::WorkerHandle)
#[derive(Debug)]
pub struct ResultChannel {
    rx: mpsc::Receiver<WorkerMessage>,
}

impl ResultChannel {
    /// Wait up to `timeout` for the next message
    pub async fn recv_timeout(&mut self, timeout: Duration) -> ChannelPoll {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(message)) => ChannelPoll::Message(message),
            Ok(None) => ChannelPoll::Disconnected,
            Err(_) => ChannelPoll::TimedOut,
        }
    }

    /// Refuse further sends (blocked producers get [`ChannelClosed`]) and
    /// discard everything still buffered. Returns the number discarded.
    pub fn close_and_drain(&mut self) -> usize {
        self.rx.close();
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}
