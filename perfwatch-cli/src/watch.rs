use perfwatchd::{
    ChannelHandler, Config, ConsoleRenderer, Metrics, Monitor, MonitorEvent, SysinfoProvider,
};
use std::error::Error;
use std::sync::Arc;

/// Runs an in-process monitor and prints its events from this task until
/// `count` ticks have been shown.
pub async fn run_watch(config: &Config, count: u64, color: bool) -> Result<(), Box<dyn Error>> {
    let metrics = Arc::new(Metrics::new());
    let provider = Box::new(SysinfoProvider::new());
    let mut monitor = Monitor::new(config, provider, Arc::clone(&metrics))?;
    let (ui, mut events) = ChannelHandler::new(config.output.ui_queue_depth, Arc::clone(&metrics));
    monitor.add_handler(Arc::new(ui))?;
    let console = ConsoleRenderer::new(color);

    println!("{}", ConsoleRenderer::header());
    monitor.start()?;
    let mut shown = 0u64;
    while shown < count {
        match events.recv().await {
            Some(MonitorEvent::Tick { snapshot, breaches }) => {
                println!("{}", console.format_line(&snapshot, &breaches));
                shown += 1;
            }
            Some(MonitorEvent::Alert(alert)) => println!("{}", console.format_alert(&alert)),
            None => break,
        }
    }
    monitor.stop().await?;

    while let Ok(event) = events.try_recv() {
        if let MonitorEvent::Alert(alert) = event {
            println!("{}", console.format_alert(&alert));
        }
    }
    Ok(())
}
