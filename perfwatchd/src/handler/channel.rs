use super::Handler;
use crate::metrics::Metrics;
use crate::types::{AlertEvent, Breach, Snapshot};
use async_trait::async_trait;
use log::warn;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum MonitorEvent {
    Tick {
        snapshot: Snapshot,
        breaches: Vec<Breach>,
    },
    Alert(AlertEvent),
}

/// Posts monitor output onto a queue drained by a presentation loop. Never
/// waits. At most `depth` ticks may be queued; further ticks are dropped and
/// counted. Alerts are edge-triggered, so each one is always queued.
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<MonitorEvent>,
    depth: usize,
    queued_ticks: Arc<AtomicUsize>,
    metrics: Arc<Metrics>,
    saturated: AtomicBool,
    closed: AtomicBool,
}

/// Receiving half of a [`ChannelHandler`]. Events arrive in the order the
/// worker produced them.
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<MonitorEvent>,
    queued_ticks: Arc<AtomicUsize>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        let event = self.rx.recv().await?;
        Some(self.taken(event))
    }

    pub fn try_recv(&mut self) -> Result<MonitorEvent, TryRecvError> {
        let event = self.rx.try_recv()?;
        Ok(self.taken(event))
    }

    fn taken(&self, event: MonitorEvent) -> MonitorEvent {
        if matches!(event, MonitorEvent::Tick { .. }) {
            self.queued_ticks.fetch_sub(1, Ordering::AcqRel);
        }
        event
    }
}

impl ChannelHandler {
    pub fn new(depth: usize, metrics: Arc<Metrics>) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queued_ticks = Arc::new(AtomicUsize::new(0));
        let handler = Self {
            tx,
            depth: depth.max(1),
            queued_ticks: Arc::clone(&queued_ticks),
            metrics,
            saturated: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        };
        (handler, EventReceiver { rx, queued_ticks })
    }

    fn post_tick(&self, event: MonitorEvent) -> anyhow::Result<()> {
        if self.queued_ticks.fetch_add(1, Ordering::AcqRel) >= self.depth {
            self.queued_ticks.fetch_sub(1, Ordering::AcqRel);
            self.metrics.inc_ui_events_dropped();
            if !self.saturated.swap(true, Ordering::Relaxed) {
                warn!("[ui] presentation queue full; dropping ticks until it drains");
            }
            return Ok(());
        }
        self.saturated.store(false, Ordering::Relaxed);
        if self.tx.send(event).is_err() {
            self.queued_ticks.fetch_sub(1, Ordering::AcqRel);
            return self.closed_error();
        }
        Ok(())
    }

    fn post_alert(&self, event: MonitorEvent) -> anyhow::Result<()> {
        if self.tx.send(event).is_err() {
            return self.closed_error();
        }
        Ok(())
    }

    fn closed_error(&self) -> anyhow::Result<()> {
        if self.closed.swap(true, Ordering::Relaxed) {
            return Ok(());
        }
        anyhow::bail!("presentation queue closed")
    }
}

#[async_trait]
impl Handler for ChannelHandler {
    fn name(&self) -> &'static str {
        "ui_channel"
    }

    async fn on_snapshot(&self, snapshot: &Snapshot, breaches: &[Breach]) -> anyhow::Result<()> {
        self.post_tick(MonitorEvent::Tick {
            snapshot: snapshot.clone(),
            breaches: breaches.to_vec(),
        })
    }

    async fn on_alert(&self, alert: &AlertEvent) -> anyhow::Result<()> {
        self.post_alert(MonitorEvent::Alert(alert.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertKind, Metric};
    use chrono::Utc;

    fn raised_cpu() -> AlertEvent {
        AlertEvent {
            metric: Metric::Cpu,
            kind: AlertKind::Raised,
            value: 95.0,
            threshold: 80.0,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn full_queue_drops_ticks_without_blocking() {
        let metrics = Arc::new(Metrics::new());
        let (handler, mut rx) = ChannelHandler::new(2, Arc::clone(&metrics));
        let snap = Snapshot::empty(Utc::now());
        for _ in 0..5 {
            handler.on_snapshot(&snap, &[]).await.unwrap();
        }
        assert_eq!(metrics.snapshot().ui_events_dropped, 3);

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 2);
    }

    #[tokio::test]
    async fn alerts_are_kept_when_ticks_saturate() {
        let metrics = Arc::new(Metrics::new());
        let (handler, mut rx) = ChannelHandler::new(1, Arc::clone(&metrics));
        let snap = Snapshot::empty(Utc::now());
        handler.on_snapshot(&snap, &[]).await.unwrap();
        handler.on_snapshot(&snap, &[]).await.unwrap();
        handler.on_alert(&raised_cpu()).await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], MonitorEvent::Tick { .. }));
        match &events[1] {
            MonitorEvent::Alert(alert) => {
                assert_eq!(alert.kind, AlertKind::Raised);
                assert_eq!(alert.metric, Metric::Cpu);
            }
            other => panic!("expected alert, got {other:?}"),
        }
        assert_eq!(metrics.snapshot().ui_events_dropped, 1);
    }

    #[tokio::test]
    async fn draining_frees_room_for_new_ticks() {
        let metrics = Arc::new(Metrics::new());
        let (handler, mut rx) = ChannelHandler::new(1, Arc::clone(&metrics));
        let snap = Snapshot::empty(Utc::now());
        handler.on_snapshot(&snap, &[]).await.unwrap();
        assert!(rx.try_recv().is_ok());
        handler.on_snapshot(&snap, &[]).await.unwrap();
        assert!(rx.try_recv().is_ok());
        assert_eq!(metrics.snapshot().ui_events_dropped, 0);
    }

    #[tokio::test]
    async fn closed_queue_reports_once() {
        let (handler, rx) = ChannelHandler::new(1, Arc::new(Metrics::new()));
        drop(rx);
        let snap = Snapshot::empty(Utc::now());
        assert!(handler.on_snapshot(&snap, &[]).await.is_err());
        assert!(handler.on_snapshot(&snap, &[]).await.is_ok());
        assert!(handler.on_alert(&raised_cpu()).await.is_ok());
    }
}
