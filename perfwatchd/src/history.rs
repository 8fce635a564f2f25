//! Bounded, chronological snapshot history.
//!
//! The monitor worker is the only writer. Other threads read through
//! [`HistoryView`], which hands out point-in-time copies so a reader never
//! observes a half-applied eviction.

use crate::error::ConfigError;
use crate::types::{Metric, Snapshot};
use std::collections::VecDeque;
use std::collections::vec_deque;
use std::sync::{Arc, RwLock};

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Capacity is fixed for the lifetime of the buffer; zero is rejected.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Appends `snapshot`, evicting the oldest entry once at capacity.
    pub fn push(&mut self, snapshot: Snapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries.back()
    }

    /// Oldest-first iteration. The iterator is `Clone`, so it can be
    /// restarted, and the borrow pins the contents for its lifetime.
    pub fn as_sequence(&self) -> vec_deque::Iter<'_, Snapshot> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Snapshot> {
        self.entries.iter().cloned().collect()
    }

    /// Per-metric values in chronological order, gaps kept as `None`.
    pub fn series(&self, metric: Metric) -> Vec<Option<f32>> {
        self.entries.iter().map(|s| s.value(metric)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Shared read handle onto the monitor's history.
#[derive(Debug, Clone)]
pub struct HistoryView {
    inner: Arc<RwLock<HistoryBuffer>>,
}

impl HistoryView {
    pub(crate) fn new(buffer: HistoryBuffer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(buffer)),
        }
    }

    pub(crate) fn push(&self, snapshot: Snapshot) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(snapshot);
    }

    fn read<R>(&self, f: impl FnOnce(&HistoryBuffer) -> R) -> R {
        match self.inner.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Snapshot> {
        self.read(HistoryBuffer::to_vec)
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.read(|buf| buf.latest().cloned())
    }

    pub fn series(&self, metric: Metric) -> Vec<Option<f32>> {
        self.read(|buf| buf.series(metric))
    }

    pub fn len(&self) -> usize {
        self.read(HistoryBuffer::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(HistoryBuffer::is_empty)
    }

    pub fn capacity(&self) -> usize {
        self.read(HistoryBuffer::capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snap(i: i64, cpu: f32) -> Snapshot {
        let mut s = Snapshot::empty(Utc.timestamp_opt(1_700_000_000 + i, 0).unwrap());
        s.cpu_percent = Some(cpu);
        s
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            HistoryBuffer::new(0),
            Err(ConfigError::ZeroCapacity)
        ));
    }

    #[test]
    fn evicts_oldest_first() {
        let mut buf = HistoryBuffer::new(3).unwrap();
        for (i, cpu) in [10.0, 20.0, 30.0, 40.0].into_iter().enumerate() {
            buf.push(snap(i as i64, cpu));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(
            buf.series(Metric::Cpu),
            vec![Some(20.0), Some(30.0), Some(40.0)]
        );
    }

    #[test]
    fn keeps_last_n_for_various_capacities() {
        for capacity in 1..=8usize {
            let total = capacity * 3 + 1;
            let mut buf = HistoryBuffer::new(capacity).unwrap();
            for i in 0..total {
                buf.push(snap(i as i64, i as f32));
            }
            let kept: Vec<f32> = buf.as_sequence().filter_map(|s| s.cpu_percent).collect();
            let expected: Vec<f32> = ((total - capacity)..total).map(|i| i as f32).collect();
            assert_eq!(kept, expected, "capacity {capacity}");
        }
    }

    #[test]
    fn latest_tracks_last_push() {
        let mut buf = HistoryBuffer::new(2).unwrap();
        assert!(buf.latest().is_none());
        for i in 0..5 {
            let s = snap(i, i as f32 * 3.0);
            buf.push(s.clone());
            assert_eq!(buf.latest(), Some(&s));
        }
    }

    #[test]
    fn sequence_is_restartable_and_chronological() {
        let mut buf = HistoryBuffer::new(4).unwrap();
        for i in 0..4 {
            buf.push(snap(i, i as f32));
        }
        let seq = buf.as_sequence();
        let first: Vec<_> = seq.clone().map(|s| s.timestamp).collect();
        let second: Vec<_> = seq.map(|s| s.timestamp).collect();
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn view_copies_are_not_live() {
        let view = HistoryView::new(HistoryBuffer::new(2).unwrap());
        view.push(snap(0, 1.0));
        let copy = view.snapshot();
        view.push(snap(1, 2.0));
        view.push(snap(2, 3.0));
        assert_eq!(copy.len(), 1);
        assert_eq!(copy[0].cpu_percent, Some(1.0));
        assert_eq!(view.len(), 2);
        assert_eq!(view.latest().and_then(|s| s.cpu_percent), Some(3.0));
    }

    #[test]
    fn series_keeps_gaps() {
        let mut buf = HistoryBuffer::new(3).unwrap();
        buf.push(snap(0, 5.0));
        buf.push(Snapshot::empty(Utc.timestamp_opt(1_700_000_001, 0).unwrap()));
        assert_eq!(buf.series(Metric::Cpu), vec![Some(5.0), None]);
    }
}
