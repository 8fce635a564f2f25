use crate::handler::Handler;
use crate::types::{AlertEvent, AlertKind, Breach, Snapshot};
use async_trait::async_trait;
use log::{info, warn};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Recent alert transitions, optionally mirrored to a JSON-lines file.
pub struct AlertLog {
    inner: Mutex<VecDeque<AlertEvent>>,
    capacity: usize,
    file_path: Option<PathBuf>,
}

impl AlertLog {
    pub fn new(capacity: usize, file_path: Option<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            file_path,
        }
    }

    pub fn record(&self, event: AlertEvent) {
        if let Some(path) = &self.file_path {
            if let Err(err) = ensure_parent(path) {
                warn!("[alerts] failed to create directory {:?}: {}", path, err);
            } else if let Err(err) = append_record(path, &event) {
                warn!(
                    "[alerts] failed to append alert to {}: {}",
                    path.display(),
                    err
                );
            }
        }

        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if inner.len() == self.capacity {
            inner.pop_front();
        }
        inner.push_back(event);
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<AlertEvent> {
        if limit == 0 {
            return Vec::new();
        }
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.iter().rev().take(limit).cloned().collect::<Vec<_>>()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Handler for AlertLog {
    fn name(&self) -> &'static str {
        "alert_log"
    }

    async fn on_snapshot(&self, _snapshot: &Snapshot, _breaches: &[Breach]) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_alert(&self, alert: &AlertEvent) -> anyhow::Result<()> {
        match alert.kind {
            AlertKind::Raised => warn!(
                "[alerts] {} raised: {:.1} > {:.1}",
                alert.metric, alert.value, alert.threshold
            ),
            AlertKind::Cleared => info!(
                "[alerts] {} cleared: {:.1} <= {:.1}",
                alert.metric, alert.value, alert.threshold
            ),
        }
        self.record(alert.clone());
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn append_record(path: &Path, event: &AlertEvent) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}
