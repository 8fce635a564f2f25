//! Polling loop: sample → push → evaluate → notify → sleep.
//!
//! One tokio task (the worker) owns the sampler, threshold set and alert
//! state, and is the only writer of the history buffer. Everything else
//! talks to it through [`SettingsHandle`] (runtime settings),
//! [`HistoryView`] (point-in-time copies) and the registered handlers.

use crate::collectors::MetricsProvider;
use crate::config::Config;
use crate::error::{ConfigError, MonitorError};
use crate::handler::Handler;
use crate::history::{HistoryBuffer, HistoryView};
use crate::metrics::Metrics;
use crate::sampler::Sampler;
use crate::thresholds::{AlertTracker, ThresholdSet, evaluate};
use crate::types::{AlertEvent, AlertKind, Breach, Metric, Snapshot};
use futures_util::FutureExt;
use log::{debug, error, info, warn};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

/// Values the settings surface may change while the monitor runs.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    pub period: Duration,
    pub thresholds: ThresholdSet,
    pub raise_after: u32,
}

impl RuntimeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            period: config.monitor.period(),
            thresholds: config.thresholds.clone(),
            raise_after: config.alerts.raise_after,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.raise_after == 0 {
            return Err(ConfigError::Invalid("raise_after must be at least 1".into()));
        }
        self.thresholds.validate()
    }
}

/// Publishes settings changes to the worker. Changes take effect at the
/// start of the next tick.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    tx: Arc<watch::Sender<RuntimeSettings>>,
}

impl SettingsHandle {
    fn new(initial: RuntimeSettings) -> (Self, watch::Receiver<RuntimeSettings>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn current(&self) -> RuntimeSettings {
        self.tx.borrow().clone()
    }

    pub fn set_period(&self, period: Duration) -> Result<(), ConfigError> {
        self.update(|s| s.period = period)
    }

    pub fn set_threshold(&self, metric: Metric, value: Option<f32>) -> Result<(), ConfigError> {
        let mut next = self.current();
        next.thresholds.set(metric, value)?;
        self.publish(next)
    }

    pub fn set_raise_after(&self, raise_after: u32) -> Result<(), ConfigError> {
        self.update(|s| s.raise_after = raise_after)
    }

    /// Swaps in a whole settings set at once, e.g. after a config reload.
    pub fn replace(&self, next: RuntimeSettings) -> Result<(), ConfigError> {
        self.publish(next)
    }

    fn update(&self, f: impl FnOnce(&mut RuntimeSettings)) -> Result<(), ConfigError> {
        let mut next = self.current();
        f(&mut next);
        self.publish(next)
    }

    fn publish(&self, next: RuntimeSettings) -> Result<(), ConfigError> {
        next.validate()?;
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    Idle,
    Running,
}

struct StopSignal {
    running: AtomicBool,
    wake: Notify,
}

impl StopSignal {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            wake: Notify::new(),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.wake.notify_one();
    }
}

enum WorkerSlot {
    Idle(Box<Worker>),
    Running {
        handle: JoinHandle<Worker>,
        signal: Arc<StopSignal>,
    },
    Lost(String),
}

pub struct Monitor {
    slot: WorkerSlot,
    history: HistoryView,
    settings: SettingsHandle,
    metrics: Arc<Metrics>,
}

impl Monitor {
    /// Builds an idle monitor. Invalid configuration fails here, before any
    /// sampling happens.
    pub fn new(
        config: &Config,
        provider: Box<dyn MetricsProvider>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, MonitorError> {
        config.validate()?;
        let history = HistoryView::new(HistoryBuffer::new(config.monitor.history_capacity)?);
        let initial = RuntimeSettings::from_config(config);
        let (settings, settings_rx) = SettingsHandle::new(initial.clone());

        let worker = Worker {
            sampler: Sampler::new(provider, config.monitor.mount_point.clone()),
            history: history.clone(),
            tracker: AlertTracker::new(initial.raise_after),
            alerts_enabled: config.alerts.enabled,
            current: initial,
            settings: settings_rx,
            handlers: Vec::new(),
            metrics: Arc::clone(&metrics),
        };

        Ok(Self {
            slot: WorkerSlot::Idle(Box::new(worker)),
            history,
            settings,
            metrics,
        })
    }

    /// Registers a consumer. Only allowed while idle.
    pub fn add_handler(&mut self, handler: Arc<dyn Handler>) -> Result<(), MonitorError> {
        match &mut self.slot {
            WorkerSlot::Idle(worker) => {
                debug!("[monitor] registered handler {}", handler.name());
                worker.handlers.push(handler);
                Ok(())
            }
            WorkerSlot::Running { .. } => Err(MonitorError::Running),
            WorkerSlot::Lost(reason) => Err(MonitorError::WorkerLost(reason.clone())),
        }
    }

    /// Idle → Running. Calling it while already running does nothing.
    pub fn start(&mut self) -> Result<(), MonitorError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(MonitorError::NoRuntime);
        }
        let worker = match std::mem::replace(&mut self.slot, WorkerSlot::Lost(String::new())) {
            WorkerSlot::Idle(worker) => worker,
            other => {
                let result = match &other {
                    WorkerSlot::Lost(reason) => Err(MonitorError::WorkerLost(reason.clone())),
                    _ => Ok(()),
                };
                self.slot = other;
                return result;
            }
        };

        let signal = Arc::new(StopSignal::new());
        let handle = tokio::spawn(worker.run(Arc::clone(&signal)));
        self.slot = WorkerSlot::Running { handle, signal };
        Ok(())
    }

    /// Running → Idle. Waits for an in-flight tick to finish; no tick starts
    /// afterwards. Calling it while idle does nothing.
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        let slot = std::mem::replace(&mut self.slot, WorkerSlot::Lost(String::new()));
        let (handle, signal) = match slot {
            WorkerSlot::Running { handle, signal } => (handle, signal),
            other => {
                self.slot = other;
                return Ok(());
            }
        };

        signal.stop();
        match handle.await {
            Ok(worker) => {
                self.slot = WorkerSlot::Idle(Box::new(worker));
                info!("[monitor] stopped ({})", self.metrics.summary());
                Ok(())
            }
            Err(err) => {
                let reason = err.to_string();
                error!("[monitor] worker task failed: {reason}");
                self.slot = WorkerSlot::Lost(reason.clone());
                Err(MonitorError::WorkerLost(reason))
            }
        }
    }

    pub fn status(&self) -> MonitorStatus {
        match &self.slot {
            WorkerSlot::Running { .. } => MonitorStatus::Running,
            _ => MonitorStatus::Idle,
        }
    }

    pub fn history(&self) -> HistoryView {
        self.history.clone()
    }

    pub fn settings(&self) -> SettingsHandle {
        self.settings.clone()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let WorkerSlot::Running { signal, .. } = &self.slot {
            signal.stop();
        }
    }
}

struct Worker {
    sampler: Sampler,
    history: HistoryView,
    tracker: AlertTracker,
    alerts_enabled: bool,
    current: RuntimeSettings,
    settings: watch::Receiver<RuntimeSettings>,
    handlers: Vec<Arc<dyn Handler>>,
    metrics: Arc<Metrics>,
}

impl Worker {
    async fn run(mut self, signal: Arc<StopSignal>) -> Self {
        info!(
            "[monitor] started: provider={} period={:?} capacity={} handlers={}",
            self.sampler.provider_name(),
            self.current.period,
            self.history.capacity(),
            self.handlers.len()
        );

        while signal.is_running() {
            self.apply_settings();
            self.tick().await;

            if !signal.is_running() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.current.period) => {}
                _ = signal.wake.notified() => {}
            }
        }

        debug!("[monitor] worker exiting");
        self
    }

    fn apply_settings(&mut self) {
        if !self.settings.has_changed().unwrap_or(false) {
            return;
        }
        let next = self.settings.borrow_and_update().clone();
        if next.period != self.current.period {
            info!(
                "[monitor] period {:?} -> {:?}",
                self.current.period, next.period
            );
        }
        if next.thresholds != self.current.thresholds {
            info!("[monitor] thresholds updated: {:?}", next.thresholds.as_map());
        }
        self.tracker.set_raise_after(next.raise_after);
        self.current = next;
    }

    async fn tick(&mut self) {
        self.metrics.inc_ticks();

        let sampled = std::panic::catch_unwind(AssertUnwindSafe(|| self.sampler.sample()));
        let snapshot = match sampled {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => {
                self.metrics.inc_samples_failed();
                warn!("[monitor] sample failed, skipping tick: {err}");
                return;
            }
            Err(_) => {
                self.metrics.inc_samples_failed();
                warn!("[monitor] metrics provider panicked, skipping tick");
                return;
            }
        };

        self.history.push(snapshot.clone());
        let breaches = evaluate(&snapshot, &self.current.thresholds);
        let alerts = if self.alerts_enabled {
            self.tracker
                .observe(&snapshot, &breaches, &self.current.thresholds)
        } else {
            Vec::new()
        };
        for alert in &alerts {
            match alert.kind {
                AlertKind::Raised => self.metrics.inc_alerts_raised(),
                AlertKind::Cleared => self.metrics.inc_alerts_cleared(),
            }
        }

        dispatch(&self.handlers, &self.metrics, &snapshot, &breaches, &alerts).await;
    }
}

async fn dispatch(
    handlers: &[Arc<dyn Handler>],
    metrics: &Metrics,
    snapshot: &Snapshot,
    breaches: &[Breach],
    alerts: &[AlertEvent],
) {
    for handler in handlers {
        let outcome = AssertUnwindSafe(handler.on_snapshot(snapshot, breaches))
            .catch_unwind()
            .await;
        record_outcome(metrics, handler.name(), outcome);

        for alert in alerts {
            let outcome = AssertUnwindSafe(handler.on_alert(alert))
                .catch_unwind()
                .await;
            record_outcome(metrics, handler.name(), outcome);
        }
    }
}

fn record_outcome(
    metrics: &Metrics,
    name: &str,
    outcome: Result<anyhow::Result<()>, Box<dyn std::any::Any + Send>>,
) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            metrics.inc_handler_errors();
            warn!("[monitor] handler {name} failed: {err:#}");
        }
        Err(_) => {
            metrics.inc_handler_errors();
            warn!("[monitor] handler {name} panicked");
        }
    }
}
