//! Averages and peaks over a window of snapshots.

use crate::types::{Metric, Snapshot};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Aggregates over the snapshots of one window. Absent readings are skipped,
/// so every average is taken over the samples where that metric existed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    pub samples: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    pub avg_cpu: Option<f32>,
    pub peak_cpu: Option<f32>,
    pub avg_memory: Option<f32>,
    pub peak_memory: Option<f32>,
    pub avg_disk: Option<f32>,
    pub peak_temperature: Option<f32>,
    /// Mean of sent + received bytes per second.
    pub avg_network_per_sec: Option<f64>,
}

#[derive(Default)]
struct Accum {
    sum: f64,
    count: usize,
    peak: Option<f32>,
}

impl Accum {
    fn add(&mut self, value: Option<f32>) {
        let Some(v) = value else { return };
        self.sum += f64::from(v);
        self.count += 1;
        self.peak = Some(self.peak.map_or(v, |p| p.max(v)));
    }

    fn avg(&self) -> Option<f32> {
        (self.count > 0).then(|| (self.sum / self.count as f64) as f32)
    }
}

/// Summarizes `snapshots`; order does not matter.
pub fn summarize(snapshots: &[Snapshot]) -> WindowSummary {
    let mut cpu = Accum::default();
    let mut memory = Accum::default();
    let mut disk = Accum::default();
    let mut temperature = Accum::default();
    let mut net_sum = 0.0;
    let mut net_count = 0usize;

    for snap in snapshots {
        cpu.add(snap.value(Metric::Cpu));
        memory.add(snap.value(Metric::Memory));
        disk.add(snap.value(Metric::Disk));
        temperature.add(snap.value(Metric::Temperature));
        if let Some(rate) = snap.network_rate {
            net_sum += rate.total_per_sec();
            net_count += 1;
        }
    }

    WindowSummary {
        samples: snapshots.len(),
        first: snapshots.iter().map(|s| s.timestamp).min(),
        last: snapshots.iter().map(|s| s.timestamp).max(),
        avg_cpu: cpu.avg(),
        peak_cpu: cpu.peak,
        avg_memory: memory.avg(),
        peak_memory: memory.peak,
        avg_disk: disk.avg(),
        peak_temperature: temperature.peak,
        avg_network_per_sec: (net_count > 0).then(|| net_sum / net_count as f64),
    }
}

/// Parses a window such as `90s`, `15m`, `1h`, `1d` or `1w`.
pub fn parse_window(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("missing unit in window '{raw}' (use s, m, h, d or w)"))?;
    let (digits, unit) = raw.split_at(split);
    let amount: i64 = digits
        .parse()
        .map_err(|_| format!("invalid window '{raw}'"))?;
    if amount <= 0 {
        return Err(format!("window must be positive, got '{raw}'"));
    }
    let window = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        other => return Err(format!("unknown unit '{other}' in window '{raw}'")),
    };
    window.ok_or_else(|| format!("window '{raw}' is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NetworkRate;
    use chrono::TimeZone;

    fn snap(secs: i64, cpu: Option<f32>, memory: Option<f32>) -> Snapshot {
        let mut s = Snapshot::empty(Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap());
        s.cpu_percent = cpu;
        s.memory_percent = memory;
        s
    }

    #[test]
    fn averages_and_peaks_skip_absent_readings() {
        let snaps = vec![
            snap(0, Some(10.0), Some(40.0)),
            snap(1, None, Some(60.0)),
            snap(2, Some(50.0), None),
        ];
        let summary = summarize(&snaps);
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.avg_cpu, Some(30.0));
        assert_eq!(summary.peak_cpu, Some(50.0));
        assert_eq!(summary.avg_memory, Some(50.0));
        assert_eq!(summary.peak_memory, Some(60.0));
        assert_eq!(summary.avg_disk, None);
        assert_eq!(summary.first, Some(snaps[0].timestamp));
        assert_eq!(summary.last, Some(snaps[2].timestamp));
    }

    #[test]
    fn network_average_uses_both_directions() {
        let mut a = snap(0, None, None);
        a.network_rate = Some(NetworkRate {
            sent_per_sec: 100.0,
            recv_per_sec: 300.0,
        });
        let b = snap(1, None, None);
        let summary = summarize(&[a, b]);
        assert_eq!(summary.avg_network_per_sec, Some(400.0));
    }

    #[test]
    fn empty_window() {
        let summary = summarize(&[]);
        assert_eq!(summary.samples, 0);
        assert!(summary.avg_cpu.is_none());
        assert!(summary.first.is_none());
    }

    #[test]
    fn window_units() {
        assert_eq!(parse_window("90s").unwrap(), Duration::seconds(90));
        assert_eq!(parse_window("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_window("1h").unwrap(), Duration::hours(1));
        assert_eq!(parse_window("1d").unwrap(), Duration::days(1));
        assert_eq!(parse_window("2w").unwrap(), Duration::weeks(2));
        assert!(parse_window("1y").is_err());
        assert!(parse_window("60").is_err());
        assert!(parse_window("0h").is_err());
        assert!(parse_window("h").is_err());
    }
}
