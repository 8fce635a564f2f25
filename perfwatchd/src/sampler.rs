//! Turns provider queries into one [`Snapshot`] per call.

use crate::collectors::{MetricsProvider, NetCounters, TemperatureReading};
use crate::error::{ProbeError, SampleError};
use crate::types::{NetworkRate, Snapshot};
use chrono::Utc;
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

const CPU_SENSOR_KEYWORDS: [&str; 5] = ["cpu", "core", "package", "tctl", "processor"];

pub struct Sampler {
    provider: Box<dyn MetricsProvider>,
    mount_point: PathBuf,
    last_counters: Option<(NetCounters, Instant)>,
}

impl Sampler {
    pub fn new(provider: Box<dyn MetricsProvider>, mount_point: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            mount_point: mount_point.into(),
            last_counters: None,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    /// Reads every metric once. Individual query failures leave their field
    /// `None`; only a failed provider refresh fails the whole sample.
    pub fn sample(&mut self) -> Result<Snapshot, SampleError> {
        self.provider.refresh().map_err(SampleError::Refresh)?;
        let timestamp = Utc::now();

        let cpu_percent = field("cpu", self.provider.cpu_percent()).and_then(normalize_percent);
        let memory_percent = field("memory", self.provider.memory())
            .and_then(|m| m.used_percent())
            .and_then(normalize_percent);
        let disk_percent = field("disk", self.provider.disk(&self.mount_point))
            .and_then(|d| d.used_percent())
            .and_then(normalize_percent);
        let network_rate = self.network_rate();
        let temperature =
            field("temperature", self.provider.temperatures()).and_then(|r| select_temperature(&r));

        Ok(Snapshot {
            timestamp,
            cpu_percent,
            memory_percent,
            disk_percent,
            network_rate,
            temperature,
        })
    }

    // A failed read keeps the old baseline so the next success still yields
    // an average over the longer window.
    fn network_rate(&mut self) -> Option<NetworkRate> {
        let current = field("network", self.provider.network_counters())?;
        let now = Instant::now();
        let rate = self
            .last_counters
            .and_then(|(prev, at)| compute_rate(&prev, &current, now.duration_since(at)));
        self.last_counters = Some((current, now));
        rate
    }
}

fn field<T>(name: &str, result: Result<T, ProbeError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("[sampler] {name} unavailable: {err}");
            None
        }
    }
}

/// Drops non-finite readings and clamps the rest into [0, 100].
pub fn normalize_percent(value: f32) -> Option<f32> {
    value.is_finite().then(|| value.clamp(0.0, 100.0))
}

/// Per-direction byte rate between two counter readings. A counter that went
/// backwards (interface reset, wrap) counts as zero traffic.
pub fn compute_rate(
    prev: &NetCounters,
    current: &NetCounters,
    elapsed: Duration,
) -> Option<NetworkRate> {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    let sent = current.bytes_sent.saturating_sub(prev.bytes_sent);
    let recv = current.bytes_recv.saturating_sub(prev.bytes_recv);
    Some(NetworkRate {
        sent_per_sec: sent as f64 / secs,
        recv_per_sec: recv as f64 / secs,
    })
}

/// First CPU-looking sensor with a finite reading.
pub fn select_temperature(readings: &[TemperatureReading]) -> Option<f32> {
    readings
        .iter()
        .filter(|r| {
            let label = r.label.to_lowercase();
            CPU_SENSOR_KEYWORDS.iter().any(|k| label.contains(k))
        })
        .find_map(|r| r.celsius.filter(|c| c.is_finite()))
}
