use std::path::PathBuf;

/// Invalid or unreadable configuration. Fatal at construction time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("history capacity must be at least 1")]
    ZeroCapacity,

    #[error("sampling period must be greater than zero")]
    ZeroPeriod,

    #[error("threshold for {metric} must be a finite, non-negative number (got {value})")]
    InvalidThreshold { metric: String, value: f32 },

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// A single metric query failed. The sampler turns this into an absent field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProbeError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unsupported on this platform: {0}")]
    Unsupported(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

/// The provider failed as a whole; the scheduler skips the tick.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("metrics provider refresh failed: {0}")]
    Refresh(#[source] ProbeError),
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("handlers can only be registered while the monitor is idle")]
    Running,

    #[error("monitor must be started from within a tokio runtime")]
    NoRuntime,

    #[error("monitor worker terminated abnormally: {0}")]
    WorkerLost(String),
}
