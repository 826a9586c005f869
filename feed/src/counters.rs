use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility of a feed.
#[derive(Clone, Default)]
pub struct FeedCounters {
    /// Messages handed to at least one handler.
    pub delivered: Arc<AtomicU64>,
    /// Messages dropped because the payload was not a JSON object.
    pub dropped: Arc<AtomicU64>,
    /// Well-formed messages for a topic nobody listens to.
    pub unrouted: Arc<AtomicU64>,
    /// Handshakes that succeeded after the first one.
    pub reconnects: Arc<AtomicU64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedCountersSnapshot {
    pub delivered: u64,
    pub dropped: u64,
    pub unrouted: u64,
    pub reconnects: u64,
}

impl FeedCounters {
    pub fn snapshot(&self) -> FeedCountersSnapshot {
        FeedCountersSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
