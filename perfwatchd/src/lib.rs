pub mod alerts;
pub mod analytics;
pub mod collectors;
pub mod config;
pub mod error;
pub mod handler;
pub mod history;
pub mod metrics;
pub mod monitor;
pub mod sampler;
pub mod store;
pub mod thresholds;
pub mod types;

pub use alerts::AlertLog;
pub use analytics::{WindowSummary, summarize};
pub use collectors::{HostInfo, MetricsProvider, ProcessSort, ProcessTable, SysinfoProvider};
pub use config::Config;
pub use error::{ConfigError, MonitorError, ProbeError, SampleError};
pub use handler::{ChannelHandler, ConsoleRenderer, EventReceiver, Handler, MonitorEvent};
pub use history::{HistoryBuffer, HistoryView};
pub use metrics::Metrics;
pub use monitor::{Monitor, MonitorStatus, RuntimeSettings, SettingsHandle};
pub use sampler::Sampler;
pub use store::{SnapshotStore, StoreStats};
pub use thresholds::{AlertTracker, ThresholdSet, evaluate};
pub use types::{AlertEvent, AlertKind, Breach, Metric, NetworkRate, Snapshot};
