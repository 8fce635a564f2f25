use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Self-observability counters for the monitor loop.
#[derive(Debug, Default)]
pub struct Metrics {
    ticks: AtomicU64,
    samples_failed: AtomicU64,
    handler_errors: AtomicU64,
    ui_events_dropped: AtomicU64,
    alerts_raised: AtomicU64,
    alerts_cleared: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub samples_failed: u64,
    pub handler_errors: u64,
    pub ui_events_dropped: u64,
    pub alerts_raised: u64,
    pub alerts_cleared: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_ticks(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_samples_failed(&self) {
        self.samples_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_handler_errors(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ui_events_dropped(&self) {
        self.ui_events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_alerts_raised(&self) {
        self.alerts_raised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_alerts_cleared(&self) {
        self.alerts_cleared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            samples_failed: self.samples_failed.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            ui_events_dropped: self.ui_events_dropped.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            alerts_cleared: self.alerts_cleared.load(Ordering::Relaxed),
        }
    }

    /// Human-readable summary for logging
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "ticks={} failed={} handler_errors={} ui_dropped={} raised={} cleared={}",
            s.ticks,
            s.samples_failed,
            s.handler_errors,
            s.ui_events_dropped,
            s.alerts_raised,
            s.alerts_cleared
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reflects_counters() {
        let metrics = Metrics::new();
        metrics.inc_ticks();
        metrics.inc_ticks();
        metrics.inc_samples_failed();
        metrics.inc_alerts_raised();
        let summary = metrics.summary();
        assert!(summary.contains("ticks=2"));
        assert!(summary.contains("failed=1"));
        assert!(summary.contains("raised=1"));
        assert_eq!(metrics.snapshot().alerts_cleared, 0);
    }
}
