//! OS metrics providers.
//!
//! [`MetricsProvider`] is the boundary to the operating system. Each query is
//! independent so the sampler can degrade a single field without losing the
//! rest of the snapshot.

use crate::error::ProbeError;
use std::path::Path;

pub mod host;
pub mod info;
pub mod processes;

pub use host::SysinfoProvider;
pub use info::HostInfo;
pub use processes::{ProcessInfo, ProcessSort, ProcessTable};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryUsage {
    pub fn used_percent(&self) -> Option<f32> {
        if self.total_bytes == 0 {
            return None;
        }
        let used = self.total_bytes.saturating_sub(self.available_bytes);
        Some((used as f64 / self.total_bytes as f64 * 100.0) as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl DiskUsage {
    pub fn used_percent(&self) -> Option<f32> {
        if self.total_bytes == 0 {
            return None;
        }
        let used = self.total_bytes.saturating_sub(self.free_bytes);
        Some((used as f64 / self.total_bytes as f64 * 100.0) as f32)
    }
}

/// Cumulative interface counters summed over all interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureReading {
    pub label: String,
    /// `None` when the sensor exists but returned no value.
    pub celsius: Option<f32>,
}

/// Source of raw OS metrics.
///
/// `refresh` is called once per tick before the individual queries; a
/// failure there aborts the tick. Every other query may fail on its own.
pub trait MetricsProvider: Send {
    fn name(&self) -> &'static str;

    fn refresh(&mut self) -> Result<(), ProbeError>;

    fn cpu_percent(&mut self) -> Result<f32, ProbeError>;

    fn memory(&mut self) -> Result<MemoryUsage, ProbeError>;

    fn disk(&mut self, mount_point: &Path) -> Result<DiskUsage, ProbeError>;

    fn network_counters(&mut self) -> Result<NetCounters, ProbeError>;

    fn temperatures(&mut self) -> Result<Vec<TemperatureReading>, ProbeError>;
}

impl<P: MetricsProvider + ?Sized> MetricsProvider for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn refresh(&mut self) -> Result<(), ProbeError> {
        (**self).refresh()
    }

    fn cpu_percent(&mut self) -> Result<f32, ProbeError> {
        (**self).cpu_percent()
    }

    fn memory(&mut self) -> Result<MemoryUsage, ProbeError> {
        (**self).memory()
    }

    fn disk(&mut self, mount_point: &Path) -> Result<DiskUsage, ProbeError> {
        (**self).disk(mount_point)
    }

    fn network_counters(&mut self) -> Result<NetCounters, ProbeError> {
        (**self).network_counters()
    }

    fn temperatures(&mut self) -> Result<Vec<TemperatureReading>, ProbeError> {
        (**self).temperatures()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_percent_uses_available() {
        let mem = MemoryUsage {
            total_bytes: 1000,
            available_bytes: 250,
        };
        assert_eq!(mem.used_percent(), Some(75.0));
    }

    #[test]
    fn zero_totals_are_unavailable() {
        let disk = DiskUsage {
            total_bytes: 0,
            free_bytes: 0,
        };
        assert_eq!(disk.used_percent(), None);
        let mem = MemoryUsage {
            total_bytes: 0,
            available_bytes: 0,
        };
        assert_eq!(mem.used_percent(), None);
    }

    #[test]
    fn free_above_total_saturates() {
        let disk = DiskUsage {
            total_bytes: 100,
            free_bytes: 200,
        };
        assert_eq!(disk.used_percent(), Some(0.0));
    }
}
