use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, ProcessesToUpdate, System};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub status: String,
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub memory_percent: Option<f32>,
    /// Thread count where the platform exposes it.
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessSort {
    #[default]
    Cpu,
    Memory,
}

impl std::str::FromStr for ProcessSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(ProcessSort::Cpu),
            "memory" | "mem" => Ok(ProcessSort::Memory),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Process table sampled over one CPU measurement interval.
pub struct ProcessTable {
    sys: System,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_processes(ProcessesToUpdate::All, true);
        Self { sys }
    }

    /// Waits one measurement interval so per-process CPU usage is a real
    /// delta, then refreshes.
    pub async fn settle(&mut self) {
        tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
        self.sys.refresh_processes(ProcessesToUpdate::All, true);
    }

    pub fn processes(&self) -> Vec<ProcessInfo> {
        let total_memory = self.sys.total_memory();
        self.sys
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                status: process.status().to_string(),
                cpu_percent: process.cpu_usage(),
                memory_bytes: process.memory(),
                memory_percent: (total_memory > 0)
                    .then(|| (process.memory() as f64 / total_memory as f64 * 100.0) as f32),
                threads: process.tasks().map(|tasks| tasks.len()),
            })
            .collect()
    }
}

/// The `limit` heaviest processes by `sort`, heaviest first. Ties keep
/// ascending pid order.
pub fn top_processes(
    mut processes: Vec<ProcessInfo>,
    sort: ProcessSort,
    limit: usize,
) -> Vec<ProcessInfo> {
    processes.sort_by(|a, b| {
        let order = match sort {
            ProcessSort::Cpu => b.cpu_percent.total_cmp(&a.cpu_percent),
            ProcessSort::Memory => b.memory_bytes.cmp(&a.memory_bytes),
        };
        order.then(a.pid.cmp(&b.pid))
    });
    processes.truncate(limit);
    processes
}

/// Process count per status, e.g. `Run: 3, Sleep: 120`.
pub fn status_counts(processes: &[ProcessInfo]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for p in processes {
        *counts.entry(p.status.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(pid: u32, cpu: f32, mem: u64, status: &str) -> ProcessInfo {
        ProcessInfo {
            pid,
            name: format!("p{pid}"),
            status: status.to_string(),
            cpu_percent: cpu,
            memory_bytes: mem,
            memory_percent: None,
            threads: None,
        }
    }

    #[test]
    fn sorts_by_cpu_then_pid() {
        let procs = vec![
            proc(3, 5.0, 10, "Run"),
            proc(1, 50.0, 1, "Run"),
            proc(2, 5.0, 99, "Sleep"),
        ];
        let pids: Vec<u32> = top_processes(procs, ProcessSort::Cpu, 10)
            .iter()
            .map(|p| p.pid)
            .collect();
        assert_eq!(pids, vec![1, 2, 3]);
    }

    #[test]
    fn sorts_by_memory_and_truncates() {
        let procs = vec![
            proc(1, 0.0, 10, "Run"),
            proc(2, 0.0, 30, "Run"),
            proc(3, 0.0, 20, "Run"),
        ];
        let top = top_processes(procs, ProcessSort::Memory, 2);
        assert_eq!(top.iter().map(|p| p.pid).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn counts_statuses() {
        let procs = vec![
            proc(1, 0.0, 0, "Run"),
            proc(2, 0.0, 0, "Sleep"),
            proc(3, 0.0, 0, "Sleep"),
        ];
        let counts = status_counts(&procs);
        assert_eq!(counts.get("Sleep"), Some(&2));
        assert_eq!(counts.get("Run"), Some(&1));
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!("MEM".parse::<ProcessSort>(), Ok(ProcessSort::Memory));
        assert_eq!("cpu".parse::<ProcessSort>(), Ok(ProcessSort::Cpu));
        assert!("disk".parse::<ProcessSort>().is_err());
    }

    #[test]
    fn live_table_includes_this_process() {
        let table = ProcessTable::new();
        let me = std::process::id();
        assert!(table.processes().iter().any(|p| p.pid == me));
    }
}
