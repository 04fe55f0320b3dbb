//! Byte counter shared between the copy loop and the stall monitor.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic count of bytes written to the destination.
///
/// The copy loop is the only caller of `add`; the monitor only reads. Each
/// update is a single atomic add, so a snapshot never sees half of a chunk.
#[derive(Debug, Default)]
pub struct TransferCounter {
    written: AtomicU64,
}

impl TransferCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: u64) {
        self.written.fetch_add(n, Ordering::AcqRel);
    }

    pub fn snapshot(&self) -> u64 {
        self.written.load(Ordering::Acquire)
    }
}
