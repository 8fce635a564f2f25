use clap::{Parser, Subcommand};
use log::warn;
use perfwatchd::{Config, ProcessSort};
use std::error::Error;
use std::path::PathBuf;

mod doctor;
mod info;
mod recent;
mod top;
mod watch;

#[derive(clap::Parser, Debug)]
#[command(version, about = "Inspect host metrics and perfwatchd snapshot stores")]
struct Args {
    /// Disable colorized output
    #[clap(long, global = true)]
    no_color: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Sample every metric once and report which ones this host can provide
    Doctor {
        /// Mount point used for disk usage
        #[clap(long)]
        mount: Option<PathBuf>,
    },
    /// Describe the host: CPUs, memory, disks, boot time, interfaces
    Info,
    /// List the heaviest processes
    Top {
        /// Number of processes to show
        #[clap(long, default_value_t = 10)]
        limit: usize,
        /// Sort key: cpu or memory
        #[clap(long, default_value = "cpu")]
        sort: ProcessSort,
    },
    /// Print the most recent stored snapshots
    Recent {
        /// Snapshot database written by perfwatchd --db
        #[clap(long)]
        db: PathBuf,
        /// Number of rows to show
        #[clap(long, default_value_t = 20)]
        limit: i64,
    },
    /// Summarize a snapshot database
    Stats {
        #[clap(long)]
        db: PathBuf,
        /// Only consider snapshots from this far back, e.g. 1h or 1d
        #[clap(long)]
        since: Option<String>,
    },
    /// Run the monitor in the foreground and print each tick
    Watch {
        /// Sampling period in milliseconds
        #[clap(long)]
        period_ms: Option<u64>,
        /// Stop after this many ticks
        #[clap(long, default_value_t = 5)]
        count: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if args.no_color {
        colored::control::set_override(false);
    }
    let (config, warnings) = Config::load();
    for warning in &warnings {
        warn!("[config] {warning}");
    }

    match args.command {
        Command::Doctor { mount } => {
            let mount = mount.unwrap_or_else(|| config.monitor.mount_point.clone());
            doctor::run_doctor(&mount).await?;
        }
        Command::Info => info::run_info(),
        Command::Top { limit, sort } => top::run_top(limit, sort).await,
        Command::Recent { db, limit } => recent::run_recent(&db, limit, &config).await?,
        Command::Stats { db, since: None } => recent::run_stats(&db).await?,
        Command::Stats {
            db,
            since: Some(window),
        } => recent::run_window_stats(&db, &window).await?,
        Command::Watch { period_ms, count } => {
            let mut config = config;
            if let Some(ms) = period_ms {
                config.monitor.period_ms = ms;
            }
            let color = config.output.color && !args.no_color;
            watch::run_watch(&config, count, color).await?;
        }
    }
    Ok(())
}
