//! Bus accounting.
//!
//! Every event handed to the bus ends in exactly one of three places:
//! a destination inbox (`delivered`), the dispatcher's drop path (`dropped`),
//! or a destructive removal (`discarded`). The counters make that visible.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of a registry's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Events handed to `send_sync`.
    pub sync_sent: u64,
    /// Events handed to `send` (queued on the main server).
    pub async_sent: u64,
    /// Events appended to their destination inbox by dispatch.
    pub delivered: u64,
    /// Events destroyed by dispatch because no server matched.
    pub dropped: u64,
    /// Pending events destroyed by server removal or registry release.
    pub discarded: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    sync_sent: AtomicU64,
    async_sent: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    discarded: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_sync_sent(&self) {
        self.sync_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_async_sent(&self) {
        self.async_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self, count: usize) {
        self.discarded.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BusStats {
        BusStats {
            sync_sent: self.sync_sent.load(Ordering::Relaxed),
            async_sent: self.async_sent.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}
