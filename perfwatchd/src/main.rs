use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use perfwatchd::{
    AlertKind, AlertLog, ChannelHandler, Config, ConsoleRenderer, Handler, Metrics, Monitor,
    MonitorEvent, RuntimeSettings, SettingsHandle, SnapshotStore, SysinfoProvider, summarize,
};
use tokio::signal::unix::{SignalKind, signal};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about = "Host performance monitor")]
struct Args {
    /// Config file (default: $PERFWATCH_CONFIG or /etc/perfwatch/perfwatch.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling period in milliseconds
    #[arg(long)]
    period_ms: Option<u64>,

    /// Number of snapshots kept in memory
    #[arg(long)]
    capacity: Option<usize>,

    /// Persist every snapshot to this SQLite database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Exit after this many rendered ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Disable colorized output
    #[arg(long)]
    no_color: bool,
}

/// Returns the merged config and the warnings raised while loading it. The
/// logger is configured from the result, so warnings are logged by the caller.
fn load_config(args: &Args) -> anyhow::Result<(Config, Vec<String>)> {
    let (mut config, warnings) = match &args.config {
        Some(path) => {
            let mut cfg = Config::from_path(path)?;
            let warnings = cfg.apply_env();
            (cfg, warnings)
        }
        None => Config::load(),
    };

    if let Some(ms) = args.period_ms {
        config.monitor.period_ms = ms;
    }
    if let Some(capacity) = args.capacity {
        config.monitor.history_capacity = capacity;
    }
    if let Some(db) = &args.db {
        config.store.enabled = true;
        config.store.path = db.clone();
    }
    if args.no_color {
        config.output.color = false;
    }
    Ok((config, warnings))
}

/// Re-reads the config and hands period, thresholds and alert debounce to
/// the running worker. Capacity, store and output settings need a restart.
fn reload(args: &Args, settings: &SettingsHandle) -> anyhow::Result<()> {
    let (config, warnings) = load_config(args)?;
    for warning in &warnings {
        warn!("[config] {warning}");
    }
    settings.replace(RuntimeSettings::from_config(&config))?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, warnings) = load_config(&args)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();
    for warning in &warnings {
        warn!("[config] {warning}");
    }
    config.validate()?;

    let metrics = Arc::new(Metrics::new());
    let provider = Box::new(SysinfoProvider::new());
    let mut monitor = Monitor::new(&config, provider, Arc::clone(&metrics))?;

    let alert_log = config.alerts.enabled.then(|| {
        Arc::new(AlertLog::new(
            config.alerts.log_capacity,
            config.alerts.log_path.clone(),
        ))
    });
    if let Some(log) = &alert_log {
        monitor.add_handler(Arc::clone(log) as Arc<dyn Handler>)?;
    }
    if config.store.enabled {
        let store = SnapshotStore::new(&config.store.path)
            .await
            .with_context(|| format!("opening snapshot store {}", config.store.path.display()))?;
        monitor.add_handler(Arc::new(store))?;
    }

    let (ui, mut events) = ChannelHandler::new(config.output.ui_queue_depth, Arc::clone(&metrics));
    monitor.add_handler(Arc::new(ui))?;
    let console = ConsoleRenderer::new(config.output.color);

    info!(
        "[perfwatchd] sampling every {}ms, keeping {} snapshots (mount {})",
        config.monitor.period_ms,
        config.monitor.history_capacity,
        config.monitor.mount_point.display()
    );
    println!("{}", ConsoleRenderer::header());
    monitor.start()?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut hangup = signal(SignalKind::hangup())?;
    let settings = monitor.settings();
    let mut rendered = 0u64;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(MonitorEvent::Tick { snapshot, breaches }) => {
                    println!("{}", console.format_line(&snapshot, &breaches));
                    rendered += 1;
                    if args.ticks.is_some_and(|limit| rendered >= limit) {
                        break;
                    }
                }
                Some(MonitorEvent::Alert(alert)) => println!("{}", console.format_alert(&alert)),
                None => break,
            },
            _ = &mut shutdown => {
                info!("[perfwatchd] interrupt received, stopping");
                break;
            }
            _ = hangup.recv() => match reload(&args, &settings) {
                Ok(()) => info!("[perfwatchd] configuration reloaded"),
                Err(err) => warn!("[perfwatchd] reload failed, keeping settings: {err:#}"),
            },
        }
    }

    monitor.stop().await?;
    // Alerts posted alongside the last rendered tick are still queued.
    while let Ok(event) = events.try_recv() {
        if let MonitorEvent::Alert(alert) = event {
            println!("{}", console.format_alert(&alert));
        }
    }

    if let Some(latest) = monitor.history().latest() {
        info!("[perfwatchd] last snapshot at {}", latest.timestamp);
    }
    let window = summarize(&monitor.history().snapshot());
    info!(
        "[perfwatchd] {} snapshots in memory: avg cpu {}, peak cpu {}, avg memory {}",
        window.samples,
        percent(window.avg_cpu),
        percent(window.peak_cpu),
        percent(window.avg_memory)
    );
    if let Some(log) = &alert_log
        && !log.is_empty()
    {
        info!("[perfwatchd] {} alert transitions retained", log.len());
        for alert in log.recent(5) {
            let kind = match alert.kind {
                AlertKind::Raised => "raised",
                AlertKind::Cleared => "cleared",
            };
            info!(
                "[perfwatchd]   {} {} {} at {:.1}",
                alert.timestamp.format("%H:%M:%S"),
                alert.metric,
                kind,
                alert.value
            );
        }
    }
    info!("[perfwatchd] {}", metrics.summary());
    Ok(())
}

fn percent(value: Option<f32>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}%"))
}
