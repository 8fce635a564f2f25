use crate::types::{AlertEvent, AlertKind, Breach, Metric, Snapshot, format_opt, format_rate};
use colored::*;

/// Formats ticks and alerts for a terminal. Absent metrics show as `N/A`;
/// breached metrics are highlighted. Output is printed by whoever drains the
/// [`super::EventReceiver`], never by the worker.
pub struct ConsoleRenderer {
    color: bool,
}

impl ConsoleRenderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn header() -> String {
        format!(
            "{:<10} {:<8} {:<8} {:<8} {:<8} {:<12} {:<12}",
            "TIME", "CPU", "MEM", "DISK", "TEMP", "NET_TX", "NET_RX"
        )
    }

    pub fn format_line(&self, snapshot: &Snapshot, breaches: &[Breach]) -> String {
        let cell = |metric: Metric| -> String {
            let text = format!("{:<8}", format_opt(snapshot.value(metric), metric.unit()));
            if self.color && breaches.iter().any(|b| b.metric == metric) {
                text.red().bold().to_string()
            } else {
                text
            }
        };
        let rate = snapshot.network_rate;
        format!(
            "{:<10} {} {} {} {} {:<12} {:<12}",
            snapshot.timestamp.format("%H:%M:%S"),
            cell(Metric::Cpu),
            cell(Metric::Memory),
            cell(Metric::Disk),
            cell(Metric::Temperature),
            format_rate(rate.map(|r| r.sent_per_sec)),
            format_rate(rate.map(|r| r.recv_per_sec)),
        )
    }

    pub fn format_alert(&self, alert: &AlertEvent) -> String {
        let unit = alert.metric.unit();
        let text = match alert.kind {
            AlertKind::Raised => format!(
                "ALERT   {} at {:.1}{unit} (threshold {:.1}{unit})",
                alert.metric, alert.value, alert.threshold
            ),
            AlertKind::Cleared => format!(
                "CLEARED {} back to {:.1}{unit} (threshold {:.1}{unit})",
                alert.metric, alert.value, alert.threshold
            ),
        };
        match (self.color, alert.kind) {
            (false, _) => text,
            (true, AlertKind::Raised) => text.yellow().bold().to_string(),
            (true, AlertKind::Cleared) => text.green().to_string(),
        }
    }
}
