//! Progress reporting side channel
//!
//! The engine reports a monotonically advancing completed-count over a tokio
//! channel. The channel is a pure side channel for display purposes: it is
//! not part of the success/failure contract, events arrive in completion
//! order, and a full or dropped receiver never stalls a download.

use tokio::sync::mpsc;

/// Events emitted by the engine while a batch is in flight
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A batch of downloads was submitted
    Started {
        /// Total items in the batch
        total: usize,
        /// Human-readable description of the batch
        description: String,
        /// Unit of the downloaded things, shown next to the counter
        unit: String,
    },
    /// One item finished (successfully or not)
    ItemFinished {
        /// Target file name of the item
        name: String,
        /// Items completed so far, including this one
        completed: usize,
        /// Total items in the batch
        total: usize,
        /// Whether the item downloaded successfully
        succeeded: bool,
    },
    /// The batch completed; every item was attempted exactly once
    Finished {
        /// Items downloaded successfully
        succeeded: usize,
        /// Items that exhausted their retries
        failed: usize,
    },
}

/// Sending half of the progress side channel
pub type ProgressSender = mpsc::Sender<ProgressEvent>;

/// Receiving half of the progress side channel
pub type ProgressReceiver = mpsc::Receiver<ProgressEvent>;

/// Create a progress channel with the standard capacity
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::channel(crate::constants::workers::PROGRESS_CHANNEL_CAPACITY)
}
