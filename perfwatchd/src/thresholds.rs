//! Threshold evaluation and edge-triggered alert state.

use crate::error::ConfigError;
use crate::types::{AlertEvent, AlertKind, Breach, Metric, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_CPU: f32 = 80.0;
pub const DEFAULT_MEMORY: f32 = 85.0;
pub const DEFAULT_DISK: f32 = 90.0;
pub const DEFAULT_TEMPERATURE: f32 = 80.0;

/// Alert level per metric. A metric without an entry is never breached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSet {
    pub cpu: Option<f32>,
    pub memory: Option<f32>,
    pub disk: Option<f32>,
    pub temperature: Option<f32>,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            cpu: Some(DEFAULT_CPU),
            memory: Some(DEFAULT_MEMORY),
            disk: Some(DEFAULT_DISK),
            temperature: Some(DEFAULT_TEMPERATURE),
        }
    }
}

impl ThresholdSet {
    pub fn get(&self, metric: Metric) -> Option<f32> {
        match metric {
            Metric::Cpu => self.cpu,
            Metric::Memory => self.memory,
            Metric::Disk => self.disk,
            Metric::Temperature => self.temperature,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<f32>) -> Result<(), ConfigError> {
        if let Some(v) = value {
            validate_level(metric, v)?;
        }
        let slot = match metric {
            Metric::Cpu => &mut self.cpu,
            Metric::Memory => &mut self.memory,
            Metric::Disk => &mut self.disk,
            Metric::Temperature => &mut self.temperature,
        };
        *slot = value;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for metric in Metric::ALL {
            if let Some(v) = self.get(metric) {
                validate_level(metric, v)?;
            }
        }
        Ok(())
    }

    pub fn as_map(&self) -> BTreeMap<Metric, f32> {
        Metric::ALL
            .into_iter()
            .filter_map(|m| self.get(m).map(|v| (m, v)))
            .collect()
    }
}

fn validate_level(metric: Metric, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidThreshold {
            metric: metric.to_string(),
            value,
        });
    }
    Ok(())
}

/// Metrics of `snapshot` strictly above their threshold. Pure: the same
/// inputs always give the same breaches, in `Metric::ALL` order.
pub fn evaluate(snapshot: &Snapshot, thresholds: &ThresholdSet) -> Vec<Breach> {
    Metric::ALL
        .into_iter()
        .filter_map(|metric| {
            let value = snapshot.value(metric)?;
            let threshold = thresholds.get(metric)?;
            (value > threshold).then_some(Breach {
                metric,
                value,
                threshold,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
struct MetricAlertState {
    active: bool,
    streak: u32,
    /// Level in force when the alert was raised.
    threshold: f32,
}

/// Converts per-tick breaches into raise/clear edges.
///
/// A metric is raised after `raise_after` consecutive breaching ticks and
/// stays raised, silently, until a tick where it is present and below its
/// threshold. Ticks where the metric is absent change nothing.
#[derive(Debug, Clone)]
pub struct AlertTracker {
    raise_after: u32,
    states: BTreeMap<Metric, MetricAlertState>,
}

impl AlertTracker {
    pub fn new(raise_after: u32) -> Self {
        Self {
            raise_after: raise_after.max(1),
            states: BTreeMap::new(),
        }
    }

    pub fn set_raise_after(&mut self, raise_after: u32) {
        self.raise_after = raise_after.max(1);
    }

    pub fn observe(
        &mut self,
        snapshot: &Snapshot,
        breaches: &[Breach],
        thresholds: &ThresholdSet,
    ) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        for metric in Metric::ALL {
            let Some(value) = snapshot.value(metric) else {
                continue;
            };
            let state = self.states.entry(metric).or_default();

            if let Some(breach) = breaches.iter().find(|b| b.metric == metric) {
                state.streak = state.streak.saturating_add(1);
                if !state.active && state.streak >= self.raise_after {
                    state.active = true;
                    state.threshold = breach.threshold;
                    events.push(AlertEvent {
                        metric,
                        kind: AlertKind::Raised,
                        value: breach.value,
                        threshold: breach.threshold,
                        timestamp: snapshot.timestamp,
                    });
                }
                continue;
            }

            state.streak = 0;
            if state.active {
                state.active = false;
                events.push(AlertEvent {
                    metric,
                    kind: AlertKind::Cleared,
                    value,
                    threshold: thresholds.get(metric).unwrap_or(state.threshold),
                    timestamp: snapshot.timestamp,
                });
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn is_active(tracker: &AlertTracker, metric: Metric) -> bool {
        tracker.states.get(&metric).is_some_and(|s| s.active)
    }

    fn cpu(value: f32) -> Snapshot {
        let mut s = Snapshot::empty(Utc::now());
        s.cpu_percent = Some(value);
        s
    }

    #[test]
    fn cpu_above_threshold_breaches() {
        let thresholds = ThresholdSet::default();
        assert_eq!(
            evaluate(&cpu(85.0), &thresholds),
            vec![Breach {
                metric: Metric::Cpu,
                value: 85.0,
                threshold: 80.0
            }]
        );
        assert!(evaluate(&cpu(79.0), &thresholds).is_empty());
    }

    #[test]
    fn equal_to_threshold_is_not_a_breach() {
        assert!(evaluate(&cpu(80.0), &ThresholdSet::default()).is_empty());
    }

    #[test]
    fn absent_metrics_never_breach() {
        let snap = Snapshot::empty(Utc::now());
        assert!(evaluate(&snap, &ThresholdSet::default()).is_empty());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let mut snap = cpu(99.0);
        snap.memory_percent = Some(90.0);
        snap.disk_percent = Some(95.0);
        snap.temperature = Some(70.0);
        let thresholds = ThresholdSet::default();
        let first = evaluate(&snap, &thresholds);
        for _ in 0..10 {
            assert_eq!(evaluate(&snap, &thresholds), first);
        }
        let metrics: Vec<Metric> = first.iter().map(|b| b.metric).collect();
        assert_eq!(metrics, vec![Metric::Cpu, Metric::Memory, Metric::Disk]);
    }

    #[test]
    fn rejects_invalid_levels() {
        let mut thresholds = ThresholdSet::default();
        assert!(thresholds.set(Metric::Cpu, Some(-1.0)).is_err());
        assert!(thresholds.set(Metric::Disk, Some(f32::NAN)).is_err());
        assert!(thresholds.set(Metric::Cpu, None).is_ok());
        assert_eq!(thresholds.get(Metric::Cpu), None);
        assert!(evaluate(&cpu(100.0), &thresholds).is_empty());
    }

    #[test]
    fn raises_once_while_breached() {
        let thresholds = ThresholdSet::default();
        let mut tracker = AlertTracker::new(1);
        let mut raised = 0;
        for value in [85.0, 90.0, 95.0, 88.0] {
            let snap = cpu(value);
            let breaches = evaluate(&snap, &thresholds);
            raised += tracker
                .observe(&snap, &breaches, &thresholds)
                .iter()
                .filter(|e| e.kind == AlertKind::Raised)
                .count();
        }
        assert_eq!(raised, 1);
        assert!(is_active(&tracker, Metric::Cpu));

        let snap = cpu(10.0);
        let events = tracker.observe(&snap, &[], &thresholds);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AlertKind::Cleared);
        assert!(!is_active(&tracker, Metric::Cpu));
    }

    #[test]
    fn requires_sustained_breach() {
        let thresholds = ThresholdSet::default();
        let mut tracker = AlertTracker::new(3);
        let mut kinds = Vec::new();
        for value in [90.0, 90.0, 50.0, 90.0, 90.0, 90.0] {
            let snap = cpu(value);
            let breaches = evaluate(&snap, &thresholds);
            for event in tracker.observe(&snap, &breaches, &thresholds) {
                kinds.push(event.kind);
            }
        }
        assert_eq!(kinds, vec![AlertKind::Raised]);
    }

    #[test]
    fn absent_tick_keeps_alert_state() {
        let thresholds = ThresholdSet::default();
        let mut tracker = AlertTracker::new(1);
        let snap = cpu(95.0);
        let breaches = evaluate(&snap, &thresholds);
        assert_eq!(tracker.observe(&snap, &breaches, &thresholds).len(), 1);

        let gap = Snapshot::empty(Utc::now());
        assert!(tracker.observe(&gap, &[], &thresholds).is_empty());
        assert!(is_active(&tracker, Metric::Cpu));

        let snap = cpu(96.0);
        let breaches = evaluate(&snap, &thresholds);
        assert!(tracker.observe(&snap, &breaches, &thresholds).is_empty());
    }
}
