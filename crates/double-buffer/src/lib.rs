//! Double-Buffered Snapshot Publisher
//!
//! Hands complete snapshots from a polling writer to an independently clocked
//! transfer interrupt that shifts them out one byte at a time.

mod buffer;

pub use buffer::{DoubleBuffer, Phase};

use thiserror::Error;

/// Publication errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The transfer side is midway through the committed snapshot; the swap
    /// must wait until it finishes
    #[error("Transfer in flight, swap deferred")]
    TransferInFlight,
}
