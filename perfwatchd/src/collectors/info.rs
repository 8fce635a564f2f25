//! Static host description: identity, hardware totals, boot time.

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::path::PathBuf;
use sysinfo::{Disks, Networks, System};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskInfo {
    pub name: String,
    pub mount_point: PathBuf,
    pub file_system: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostInfo {
    pub hostname: Option<String>,
    pub os: Option<String>,
    pub kernel: Option<String>,
    pub arch: String,
    pub cpu_brand: Option<String>,
    pub cpu_count: usize,
    /// Highest current frequency reported by any core, in MHz.
    pub cpu_frequency_mhz: Option<u64>,
    pub total_memory_bytes: u64,
    pub total_swap_bytes: u64,
    pub disks: Vec<DiskInfo>,
    pub boot_time: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
    /// Interface names, sorted.
    pub interfaces: Vec<String>,
}

impl HostInfo {
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();

        let cpus = sys.cpus();
        let cpu_brand = cpus
            .first()
            .map(|c| c.brand().trim().to_string())
            .filter(|b| !b.is_empty());
        let cpu_frequency_mhz = cpus.iter().map(|c| c.frequency()).max().filter(|f| *f > 0);

        let disks = Disks::new_with_refreshed_list()
            .list()
            .iter()
            .map(|d| DiskInfo {
                name: d.name().to_string_lossy().into_owned(),
                mount_point: d.mount_point().to_path_buf(),
                file_system: d.file_system().to_string_lossy().into_owned(),
                total_bytes: d.total_space(),
                available_bytes: d.available_space(),
            })
            .collect::<Vec<_>>();

        let mut interfaces: Vec<String> = Networks::new_with_refreshed_list()
            .list()
            .keys()
            .cloned()
            .collect();
        interfaces.sort();

        let boot = System::boot_time();
        let info = Self {
            hostname: System::host_name(),
            os: System::long_os_version(),
            kernel: System::kernel_version(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_brand,
            cpu_count: cpus.len(),
            cpu_frequency_mhz,
            total_memory_bytes: sys.total_memory(),
            total_swap_bytes: sys.total_swap(),
            disks,
            boot_time: boot_timestamp(boot),
            uptime_secs: System::uptime(),
            interfaces,
        };
        debug!(
            "[info] {} cpus, {} disks, {} interfaces",
            info.cpu_count,
            info.disks.len(),
            info.interfaces.len()
        );
        info
    }

    /// Sum over disks, counting each device once even when it is mounted in
    /// several places.
    pub fn total_disk_bytes(&self) -> u64 {
        let mut seen = std::collections::BTreeSet::new();
        self.disks
            .iter()
            .filter(|d| seen.insert(d.name.as_str()))
            .map(|d| d.total_bytes)
            .sum()
    }
}

fn boot_timestamp(secs: u64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)
}

/// `3d 04:05:06` style uptime.
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let rest = secs % 86_400;
    let clock = format!("{:02}:{:02}:{:02}", rest / 3600, (rest % 3600) / 60, rest % 60);
    if days > 0 {
        format!("{days}d {clock}")
    } else {
        clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(name: &str, mount: &str, total: u64) -> DiskInfo {
        DiskInfo {
            name: name.to_string(),
            mount_point: PathBuf::from(mount),
            file_system: "ext4".to_string(),
            total_bytes: total,
            available_bytes: 0,
        }
    }

    #[test]
    fn bind_mounts_are_counted_once() {
        let mut info = HostInfo::collect();
        info.disks = vec![
            disk("/dev/sda1", "/", 100),
            disk("/dev/sda1", "/var/lib/docker", 100),
            disk("/dev/sdb1", "/data", 50),
        ];
        assert_eq!(info.total_disk_bytes(), 150);
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(59), "00:00:59");
        assert_eq!(format_uptime(3_661), "01:01:01");
        assert_eq!(format_uptime(3 * 86_400 + 4 * 3600 + 5 * 60 + 6), "3d 04:05:06");
    }

    #[test]
    fn zero_boot_time_is_unknown() {
        assert!(boot_timestamp(0).is_none());
        assert_eq!(
            boot_timestamp(1_700_000_000).map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn collect_reports_this_host() {
        let info = HostInfo::collect();
        assert!(!info.arch.is_empty());
        assert!(info.total_memory_bytes > 0);
    }
}
