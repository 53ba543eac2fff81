//! Capture session counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the worker, submission tasks and presenter
#[derive(Debug, Default)]
pub struct CaptureStats {
    delivered: AtomicU64,
    dropped_busy: AtomicU64,
    extraction_failed: AtomicU64,
    submitted: AtomicU64,
    completed: AtomicU64,
    discarded_late: AtomicU64,
}

/// Point-in-time copy of [`CaptureStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Frames received by the worker
    pub delivered: u64,
    /// Frames dropped because a request was in flight
    pub dropped_busy: u64,
    pub extraction_failed: u64,
    pub submitted: u64,
    /// Requests that produced a result (including unknown verdicts)
    pub completed: u64,
    /// Results ignored because the session had been stopped
    pub discarded_late: u64,
}

impl CaptureStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            extraction_failed: self.extraction_failed.load(Ordering::Relaxed),
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            discarded_late: self.discarded_late.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_busy(&self) {
        self.dropped_busy.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_extraction_failed(&self) {
        self.extraction_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded_late(&self) {
        self.discarded_late.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = CaptureStats::default();
        stats.record_delivered();
        stats.record_delivered();
        stats.record_dropped_busy();
        stats.record_submitted();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.delivered, 2);
        assert_eq!(snapshot.dropped_busy, 1);
        assert_eq!(snapshot.submitted, 1);
        assert_eq!(snapshot.completed, 0);
    }
}
