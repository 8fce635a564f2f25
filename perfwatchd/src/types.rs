use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One measurement of the host at one instant.
///
/// Every metric is optional: `None` means the provider could not deliver the
/// value this tick (permission denied, missing sensor, unsupported platform).
/// It is never the same thing as a reading of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: Option<f32>,
    pub memory_percent: Option<f32>,
    pub disk_percent: Option<f32>,
    /// Absent on the first sample, before a counter baseline exists.
    pub network_rate: Option<NetworkRate>,
    /// Degrees Celsius.
    pub temperature: Option<f32>,
}

impl Snapshot {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            cpu_percent: None,
            memory_percent: None,
            disk_percent: None,
            network_rate: None,
            temperature: None,
        }
    }

    /// Value of a thresholded metric, if present.
    pub fn value(&self, metric: Metric) -> Option<f32> {
        match metric {
            Metric::Cpu => self.cpu_percent,
            Metric::Memory => self.memory_percent,
            Metric::Disk => self.disk_percent,
            Metric::Temperature => self.temperature,
        }
    }

    /// Number of metric fields that carry a value (network counts once).
    pub fn present_fields(&self) -> usize {
        Metric::ALL
            .iter()
            .filter(|m| self.value(**m).is_some())
            .count()
            + usize::from(self.network_rate.is_some())
    }
}

/// Network throughput since the previous counter reading, bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkRate {
    pub sent_per_sec: f64,
    pub recv_per_sec: f64,
}

impl NetworkRate {
    pub fn total_per_sec(&self) -> f64 {
        self.sent_per_sec + self.recv_per_sec
    }
}

/// Metrics that can carry an alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
    Temperature,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Cpu,
        Metric::Memory,
        Metric::Disk,
        Metric::Temperature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Memory => "memory",
            Metric::Disk => "disk",
            Metric::Temperature => "temperature",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            _ => "%",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Metric::Cpu),
            "memory" | "mem" => Ok(Metric::Memory),
            "disk" => Ok(Metric::Disk),
            "temperature" | "temp" => Ok(Metric::Temperature),
            other => Err(format!("unknown metric: {other}")),
        }
    }
}

/// A metric above its configured threshold on a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breach {
    pub metric: Metric,
    pub value: f32,
    pub threshold: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Raised,
    Cleared,
}

/// Alert state transition. Emitted once per clear→active or active→clear edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub metric: Metric,
    pub kind: AlertKind,
    pub value: f32,
    pub threshold: f32,
    pub timestamp: DateTime<Utc>,
}

/// Renders an optional reading, `N/A` when absent.
pub fn format_opt(value: Option<f32>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{unit}"),
        None => "N/A".to_string(),
    }
}

/// Renders a byte rate in the largest unit that keeps it above one.
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(bytes) => format!("{}/s", format_bytes(bytes)),
        None => "N/A".to_string(),
    }
}

/// `1.5GiB` style size.
pub fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1}{}", UNITS[unit])
}
