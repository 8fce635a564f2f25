use chrono::{DateTime, Utc};
use colored::*;
use perfwatchd::analytics::parse_window;
use perfwatchd::types::format_rate;
use perfwatchd::{Config, ConsoleRenderer, SnapshotStore, evaluate, summarize};
use std::error::Error;
use std::path::Path;

pub async fn run_recent(db: &Path, limit: i64, config: &Config) -> Result<(), Box<dyn Error>> {
    let store = SnapshotStore::open_read_only(db).await?;
    let mut snapshots = store.recent(limit.max(0)).await?;
    if snapshots.is_empty() {
        println!("{}", "No snapshots recorded yet.".dimmed());
        return Ok(());
    }
    // Oldest at the top, like a live feed.
    snapshots.reverse();

    let console = ConsoleRenderer::new(config.output.color);
    println!("{}", ConsoleRenderer::header());
    for snapshot in &snapshots {
        let breaches = evaluate(snapshot, &config.thresholds);
        println!("{}", console.format_line(snapshot, &breaches));
    }
    Ok(())
}

fn format_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn format_avg(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{unit}"),
        None => "N/A".to_string(),
    }
}

fn format_pct(value: Option<f32>) -> String {
    format_avg(value.map(f64::from), "%")
}

pub async fn run_stats(db: &Path) -> Result<(), Box<dyn Error>> {
    let store = SnapshotStore::open_read_only(db).await?;
    let stats = store.stats().await?;

    println!("{}", format!("Snapshot store {}", db.display()).bold());
    println!("{:<18} {}", "snapshots", stats.total);
    println!("{:<18} {}", "first", format_time(stats.first));
    println!("{:<18} {}", "last", format_time(stats.last));
    println!("{:<18} {}", "avg cpu", format_avg(stats.avg_cpu_percent, "%"));
    println!("{:<18} {}", "avg memory", format_avg(stats.avg_memory_percent, "%"));
    println!("{:<18} {}", "avg disk", format_avg(stats.avg_disk_percent, "%"));
    println!("{:<18} {}", "max temperature", format_avg(stats.max_temperature, "°C"));
    let unavailable = format!("{}", stats.cpu_unavailable);
    println!(
        "{:<18} {}",
        "cpu unavailable",
        if stats.cpu_unavailable > 0 {
            unavailable.yellow()
        } else {
            unavailable.normal()
        }
    );
    Ok(())
}

/// Averages and peaks over the snapshots recorded in the last `window`.
pub async fn run_window_stats(db: &Path, window: &str) -> Result<(), Box<dyn Error>> {
    let span = parse_window(window)?;
    let store = SnapshotStore::open_read_only(db).await?;
    let snapshots = store.since(Utc::now() - span).await?;
    let summary = summarize(&snapshots);

    println!(
        "{}",
        format!("Snapshot store {} (last {window})", db.display()).bold()
    );
    if summary.samples == 0 {
        println!("{}", "No snapshots in this window.".dimmed());
        return Ok(());
    }
    println!("{:<18} {}", "snapshots", summary.samples);
    println!("{:<18} {}", "first", format_time(summary.first));
    println!("{:<18} {}", "last", format_time(summary.last));
    println!("{:<18} {:<10} {:<10}", "", "AVG", "PEAK");
    println!(
        "{:<18} {:<10} {:<10}",
        "cpu",
        format_pct(summary.avg_cpu),
        format_pct(summary.peak_cpu)
    );
    println!(
        "{:<18} {:<10} {:<10}",
        "memory",
        format_pct(summary.avg_memory),
        format_pct(summary.peak_memory)
    );
    println!("{:<18} {:<10}", "disk", format_pct(summary.avg_disk));
    println!(
        "{:<18} {:<10} {:<10}",
        "temperature",
        "",
        format_avg(summary.peak_temperature.map(f64::from), "°C")
    );
    println!(
        "{:<18} {:<10}",
        "network",
        format_rate(summary.avg_network_per_sec)
    );
    Ok(())
}
