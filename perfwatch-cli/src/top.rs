use colored::*;
use perfwatchd::ProcessSort;
use perfwatchd::ProcessTable;
use perfwatchd::collectors::processes::{status_counts, top_processes};
use perfwatchd::types::{format_bytes, format_opt};

pub async fn run_top(limit: usize, sort: ProcessSort) {
    let mut table = ProcessTable::new();
    table.settle().await;
    let processes = table.processes();

    let counts = status_counts(&processes)
        .into_iter()
        .map(|(status, n)| format!("{status}: {n}"))
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "{}",
        format!("{} processes ({counts})", processes.len()).dimmed()
    );
    println!(
        "{:>8} {:<24} {:>8} {:>10} {:>8} {:>8} {:<10}",
        "PID", "NAME", "CPU", "MEM", "MEM%", "THREADS", "STATUS"
    );
    for p in top_processes(processes, sort, limit) {
        let name: String = p.name.chars().take(24).collect();
        let cpu = format!("{:>8}", format!("{:.1}%", p.cpu_percent));
        println!(
            "{:>8} {:<24} {} {:>10} {:>8} {:>8} {:<10}",
            p.pid,
            name,
            if p.cpu_percent >= 50.0 {
                cpu.red().bold()
            } else {
                cpu.normal()
            },
            format_bytes(p.memory_bytes as f64),
            format_opt(p.memory_percent, "%"),
            p.threads.map_or_else(|| "N/A".to_string(), |t| t.to_string()),
            p.status
        );
    }
}
