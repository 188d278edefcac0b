//! Services module - the generation side of a job.
//!
//! Nothing here knows about job state, epochs beyond tagging, or reporting. The
//! controller drives these pieces; they only produce designs.
//!
//! # Components
//!
//! - [`result_channel`]: bounded, epoch-tagged FIFO from one worker to the controller.
//!   The controller side polls with a timeout so it can re-check cancellation.
//!
//! - [`WorkerHandle`]: one spawned generation task plus its private cancel signal.
//!   Joined (never abandoned) before the next job starts.
//!
//! - [`DesignGenerator`]: the opaque computation. Two implementations ship:
//!   - [`ProcessGenerator`]: runs an external program and parses its stdout line by line
//!   - [`ThreadedGenerator`]: runs a blocking closure on tokio's blocking pool
//!
//! # Usage Example
//!
//! ```ignore
//! use design_runner::services::{ProcessGenerator, WorkerHandle};
//!
//! let generator = Arc::new(ProcessGenerator::new(&settings.generator));
//! let mut worker = WorkerHandle::start(generator, job, epoch, 64);
//!
//! match worker.poll(Duration::from_secs(1)).await {
//!     ChannelPoll::Message(message) => { /* ... */ }
//!     ChannelPoll::TimedOut => { /* check cancellation */ }
//!     ChannelPoll::Disconnected => { /* worker gone */ }
//! }
//!
//! worker.request_cancel();
//! worker.await_termination(Duration::from_secs(5)).await;
//! ```

pub mod channel;
pub mod process;
pub mod worker;

pub use channel::{
    ChannelClosed, ChannelPoll, Payload, ResultChannel, ResultSender, WorkerMessage,
    result_channel,
};
pub use process::{OutputLine, ProcessGenerator};
pub use worker::{
    CancelSignal, DesignGenerator, GenerationError, ThreadedGenerator, WorkerExit, WorkerHandle,
};
