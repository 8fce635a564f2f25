use colored::*;
use perfwatchd::types::{format_opt, format_rate};
use perfwatchd::{Metric, Sampler, SysinfoProvider};
use std::error::Error;
use std::path::Path;
use std::time::Duration;

// sysinfo needs two refreshes this far apart for a meaningful CPU delta.
const SETTLE: Duration = Duration::from_millis(500);

pub async fn run_doctor(mount: &Path) -> Result<(), Box<dyn Error>> {
    println!("{}", "🩺 Perfwatch Doctor".bold().cyan());
    println!("{}", "Probing host metrics...".dimmed());
    println!();

    let mut sampler = Sampler::new(Box::new(SysinfoProvider::new()), mount);
    println!("• Provider:           {}", sampler.provider_name());
    println!("• Disk mount point:   {}", sampler.mount_point().display());

    // The first sample only primes the network counters.
    if let Err(e) = sampler.sample() {
        println!("{}", format!("FAIL ({e})").red());
        return Ok(());
    }
    tokio::time::sleep(SETTLE).await;
    let snapshot = match sampler.sample() {
        Ok(s) => s,
        Err(e) => {
            println!("{}", format!("FAIL ({e})").red());
            return Ok(());
        }
    };
    println!();

    for metric in Metric::ALL {
        print!("• {:<20}", format!("{metric}:"));
        match snapshot.value(metric) {
            Some(v) => {
                let reading = format_opt(Some(v), metric.unit());
                println!("{}", format!("OK ({reading})").green());
            }
            None => println!("{}", "N/A".yellow()),
        }
    }

    print!("• {:<20}", "network:");
    match snapshot.network_rate {
        Some(rate) => println!(
            "{}",
            format!(
                "OK (tx {}, rx {})",
                format_rate(Some(rate.sent_per_sec)),
                format_rate(Some(rate.recv_per_sec))
            )
            .green()
        ),
        None => println!("{}", "N/A".yellow()),
    }

    // Every metric plus the network rate.
    let missing = Metric::ALL.len() + 1 - snapshot.present_fields();
    println!();
    if missing == 0 {
        println!("{}", "✅ All metrics available".green().bold());
    } else {
        println!(
            "{}",
            format!("⚠️  {missing} metric(s) unavailable on this host; they will show as N/A")
                .yellow()
                .bold()
        );
    }
    Ok(())
}
