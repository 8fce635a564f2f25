use super::{DiskUsage, MemoryUsage, MetricsProvider, NetCounters, TemperatureReading};
use crate::error::ProbeError;
use log::debug;
use std::path::Path;
use sysinfo::{Components, Disks, Networks, System};

const LOOPBACK_INTERFACES: [&str; 2] = ["lo", "lo0"];

/// Production provider backed by `sysinfo`.
///
/// Keeps its `System`, `Disks`, `Networks` and `Components` handles alive
/// between ticks: CPU usage is computed against the previous refresh.
pub struct SysinfoProvider {
    sys: System,
    disks: Disks,
    networks: Networks,
    components: Components,
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoProvider {
    pub fn new() -> Self {
        let mut sys = System::new();
        // Baseline for the first cpu_percent() delta.
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let disks = Disks::new_with_refreshed_list();
        let networks = Networks::new_with_refreshed_list();
        let components = Components::new_with_refreshed_list();
        debug!(
            "[sampler] sysinfo provider: {} cpus, {} disks, {} interfaces, {} sensors",
            sys.cpus().len(),
            disks.list().len(),
            networks.list().len(),
            components.list().len()
        );

        Self {
            sys,
            disks,
            networks,
            components,
        }
    }
}

impl MetricsProvider for SysinfoProvider {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    fn refresh(&mut self) -> Result<(), ProbeError> {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.disks.refresh(true);
        if self.disks.list().is_empty() {
            self.disks.refresh(false);
        }
        self.networks.refresh(true);
        self.components.refresh(true);
        Ok(())
    }

    fn cpu_percent(&mut self) -> Result<f32, ProbeError> {
        if self.sys.cpus().is_empty() {
            return Err(ProbeError::Unsupported("no cpus reported".into()));
        }
        Ok(self.sys.global_cpu_usage())
    }

    fn memory(&mut self) -> Result<MemoryUsage, ProbeError> {
        let total_bytes = self.sys.total_memory();
        if total_bytes == 0 {
            return Err(ProbeError::Unsupported("total memory unknown".into()));
        }
        Ok(MemoryUsage {
            total_bytes,
            available_bytes: self.sys.available_memory(),
        })
    }

    fn disk(&mut self, mount_point: &Path) -> Result<DiskUsage, ProbeError> {
        self.disks
            .list()
            .iter()
            .find(|d| d.mount_point() == mount_point)
            .map(|d| DiskUsage {
                total_bytes: d.total_space(),
                free_bytes: d.available_space(),
            })
            .ok_or_else(|| ProbeError::NotFound(format!("mount point {}", mount_point.display())))
    }

    fn network_counters(&mut self) -> Result<NetCounters, ProbeError> {
        let mut counters = NetCounters::default();
        let mut interfaces = 0usize;
        for (name, data) in self.networks.list() {
            if LOOPBACK_INTERFACES.contains(&name.as_str()) {
                continue;
            }
            interfaces += 1;
            counters.bytes_sent = counters.bytes_sent.saturating_add(data.total_transmitted());
            counters.bytes_recv = counters.bytes_recv.saturating_add(data.total_received());
        }
        if interfaces == 0 {
            return Err(ProbeError::Unsupported("no network interfaces".into()));
        }
        Ok(counters)
    }

    fn temperatures(&mut self) -> Result<Vec<TemperatureReading>, ProbeError> {
        let readings: Vec<TemperatureReading> = self
            .components
            .list()
            .iter()
            .map(|c| TemperatureReading {
                label: c.label().to_string(),
                celsius: c.temperature(),
            })
            .collect();
        if readings.is_empty() {
            return Err(ProbeError::Unsupported("no temperature sensors".into()));
        }
        Ok(readings)
    }
}
