//! Optional snapshot persistence
//!
//! Appends every snapshot to a single SQLite table. Absent metrics are stored
//! as NULL so "unavailable" survives the round trip. The monitor runs fine
//! without a store.

use crate::handler::Handler;
use crate::types::{Breach, NetworkRate, Snapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

pub struct SnapshotStore {
    pool: SqlitePool,
}

impl SnapshotStore {
    /// Open (or create) the store at `db_path`.
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, sqlx::Error> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp_ms INTEGER NOT NULL,
                cpu_percent REAL,
                memory_percent REAL,
                disk_percent REAL,
                net_sent_per_sec REAL,
                net_recv_per_sec REAL,
                temperature REAL
            );
            CREATE INDEX IF NOT EXISTS idx_snapshots_timestamp ON snapshots(timestamp_ms);
            "#,
        )
        .execute(&pool)
        .await?;

        info!("Snapshot store initialized at {}", db_path.as_ref().display());
        Ok(Self { pool })
    }

    /// Open an existing store for reading. Fails when `db_path` does not
    /// exist instead of creating an empty database there.
    pub async fn open_read_only<P: AsRef<Path>>(db_path: P) -> Result<Self, sqlx::Error> {
        let db_url = format!("sqlite://{}?mode=ro", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&db_url)
            .await?;
        debug!("Opened snapshot store {} read-only", db_path.as_ref().display());
        Ok(Self { pool })
    }

    pub async fn insert(&self, snapshot: &Snapshot) -> Result<i64, sqlx::Error> {
        let rate = snapshot.network_rate;
        let result = sqlx::query(
            r#"
            INSERT INTO snapshots (
                timestamp_ms, cpu_percent, memory_percent, disk_percent,
                net_sent_per_sec, net_recv_per_sec, temperature
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(snapshot.timestamp.timestamp_millis())
        .bind(snapshot.cpu_percent)
        .bind(snapshot.memory_percent)
        .bind(snapshot.disk_percent)
        .bind(rate.map(|r| r.sent_per_sec))
        .bind(rate.map(|r| r.recv_per_sec))
        .bind(snapshot.temperature)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Inserted snapshot #{}", id);
        Ok(id)
    }

    /// Most recent snapshots, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Snapshot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp_ms, cpu_percent, memory_percent, disk_percent,
                   net_sent_per_sec, net_recv_per_sec, temperature
            FROM snapshots
            ORDER BY timestamp_ms DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_snapshot).collect())
    }

    /// Snapshots at or after `start`, oldest first.
    pub async fn since(&self, start: DateTime<Utc>) -> Result<Vec<Snapshot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp_ms, cpu_percent, memory_percent, disk_percent,
                   net_sent_per_sec, net_recv_per_sec, temperature
            FROM snapshots
            WHERE timestamp_ms >= ?
            ORDER BY timestamp_ms ASC, id ASC
            "#,
        )
        .bind(start.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_snapshot).collect())
    }

    /// Aggregates over the whole table. Averages skip NULLs, so they are
    /// taken over the samples where the metric was available.
    pub async fn stats(&self) -> Result<StoreStats, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*), MIN(timestamp_ms), MAX(timestamp_ms),
                   AVG(cpu_percent), AVG(memory_percent), AVG(disk_percent),
                   MAX(temperature), COUNT(cpu_percent)
            FROM snapshots
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.get(0);
        let first: Option<i64> = row.get(1);
        let last: Option<i64> = row.get(2);
        let cpu_samples: i64 = row.get(7);

        Ok(StoreStats {
            total: total as u64,
            first: first.and_then(DateTime::from_timestamp_millis),
            last: last.and_then(DateTime::from_timestamp_millis),
            avg_cpu_percent: row.get(3),
            avg_memory_percent: row.get(4),
            avg_disk_percent: row.get(5),
            max_temperature: row.get(6),
            cpu_unavailable: (total - cpu_samples).max(0) as u64,
        })
    }
}

fn row_to_snapshot(r: &SqliteRow) -> Snapshot {
    let ts: i64 = r.get(0);
    let sent: Option<f64> = r.get(4);
    let recv: Option<f64> = r.get(5);
    Snapshot {
        timestamp: DateTime::from_timestamp_millis(ts).unwrap_or_default(),
        cpu_percent: r.get(1),
        memory_percent: r.get(2),
        disk_percent: r.get(3),
        network_rate: sent.zip(recv).map(|(sent_per_sec, recv_per_sec)| NetworkRate {
            sent_per_sec,
            recv_per_sec,
        }),
        temperature: r.get(6),
    }
}

/// Statistics about stored snapshots
#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub total: u64,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    pub avg_cpu_percent: Option<f64>,
    pub avg_memory_percent: Option<f64>,
    pub avg_disk_percent: Option<f64>,
    pub max_temperature: Option<f64>,
    /// Rows where CPU usage could not be read.
    pub cpu_unavailable: u64,
}

#[async_trait]
impl Handler for SnapshotStore {
    fn name(&self) -> &'static str {
        "snapshot_store"
    }

    async fn on_snapshot(&self, snapshot: &Snapshot, _breaches: &[Breach]) -> anyhow::Result<()> {
        self.insert(snapshot).await?;
        Ok(())
    }
}
