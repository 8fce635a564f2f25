//! Consumers of monitor output.
//!
//! The worker calls every registered [`Handler`] once per tick, in
//! registration order. Handlers must not block the worker for long: anything
//! that renders or waits on a UI goes through [`ChannelHandler`].

use crate::types::{AlertEvent, Breach, Snapshot};
use async_trait::async_trait;

pub mod channel;
pub mod console;

pub use channel::{ChannelHandler, EventReceiver, MonitorEvent};
pub use console::ConsoleRenderer;

#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_snapshot(&self, snapshot: &Snapshot, breaches: &[Breach]) -> anyhow::Result<()>;

    async fn on_alert(&self, _alert: &AlertEvent) -> anyhow::Result<()> {
        Ok(())
    }
}
