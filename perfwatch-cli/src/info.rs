use colored::*;
use perfwatchd::HostInfo;
use perfwatchd::collectors::info::format_uptime;
use perfwatchd::types::format_bytes;

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".to_string())
}

pub fn run_info() {
    let info = HostInfo::collect();

    println!("{}", "🖥  Host".bold().cyan());
    println!("{:<18} {}", "hostname", or_na(info.hostname.clone()));
    println!("{:<18} {}", "os", or_na(info.os.clone()));
    println!("{:<18} {}", "kernel", or_na(info.kernel.clone()));
    println!("{:<18} {}", "arch", info.arch);
    println!(
        "{:<18} {}",
        "boot time",
        or_na(info.boot_time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()))
    );
    println!("{:<18} {}", "uptime", format_uptime(info.uptime_secs));

    println!();
    println!("{}", "CPU & memory".bold().cyan());
    println!("{:<18} {}", "cpu", or_na(info.cpu_brand.clone()));
    println!("{:<18} {}", "cores", info.cpu_count);
    println!(
        "{:<18} {}",
        "frequency",
        or_na(info.cpu_frequency_mhz.map(|f| format!("{f} MHz")))
    );
    println!(
        "{:<18} {}",
        "memory",
        format_bytes(info.total_memory_bytes as f64)
    );
    println!("{:<18} {}", "swap", format_bytes(info.total_swap_bytes as f64));

    println!();
    println!("{}", "Disks".bold().cyan());
    if info.disks.is_empty() {
        println!("{}", "No disks reported.".dimmed());
    }
    for disk in &info.disks {
        println!(
            "{:<24} {:<10} {:>10} total {:>10} free  {}",
            disk.mount_point.display(),
            disk.file_system,
            format_bytes(disk.total_bytes as f64),
            format_bytes(disk.available_bytes as f64),
            disk.name.dimmed()
        );
    }
    println!(
        "{:<18} {}",
        "total disk",
        format_bytes(info.total_disk_bytes() as f64)
    );

    println!();
    println!("{}", "Network interfaces".bold().cyan());
    if info.interfaces.is_empty() {
        println!("{}", "No interfaces reported.".dimmed());
    } else {
        println!("{}", info.interfaces.join(", "));
    }
}
