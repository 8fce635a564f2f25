use crate::error::ConfigError;
use crate::history::DEFAULT_CAPACITY;
use crate::thresholds::ThresholdSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/perfwatch/perfwatch.toml";
const CONFIG_ENV: &str = "PERFWATCH_CONFIG";
const PERIOD_ENV: &str = "PERFWATCH_PERIOD_MS";
const MOUNT_ENV: &str = "PERFWATCH_MOUNT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub thresholds: ThresholdSet,
    pub alerts: AlertsConfig,
    pub store: StoreConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub period_ms: u64,
    pub history_capacity: usize,
    pub mount_point: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            period_ms: 1_000,
            history_capacity: DEFAULT_CAPACITY,
            mount_point: PathBuf::from("/"),
        }
    }
}

impl MonitorConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub enabled: bool,
    /// Consecutive breaching ticks before an alert is raised.
    pub raise_after: u32,
    pub log_capacity: usize,
    pub log_path: Option<PathBuf>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            raise_after: 1,
            log_capacity: 256,
            log_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("perfwatch.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub ui_queue_depth: usize,
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            ui_queue_depth: 64,
            color: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Lenient load: `$PERFWATCH_CONFIG` or the system path, falling back to
    /// defaults when the file is missing or broken. Env overrides apply last.
    ///
    /// Anything that was ignored is returned as a warning, so callers can
    /// report it once their logger is installed.
    pub fn load() -> (Self, Vec<String>) {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path), |key| std::env::var(key).ok())
    }

    fn load_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let mut config = if path.exists() {
            match Self::from_path(path) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warnings.push(format!("{err}; using defaults"));
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        warnings.extend(config.apply_env_from(env));
        (config, warnings)
    }

    /// Strict load of an explicit file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Applies `PERFWATCH_PERIOD_MS` and `PERFWATCH_MOUNT`, returning a
    /// warning for each value that could not be used.
    pub fn apply_env(&mut self) -> Vec<String> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    fn apply_env_from(&mut self, env: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(raw) = env(PERIOD_ENV) {
            match raw.parse::<u64>() {
                Ok(ms) => self.monitor.period_ms = ms,
                Err(_) => warnings.push(format!("ignoring {PERIOD_ENV}={raw}: not an integer")),
            }
        }
        if let Some(mount) = env(MOUNT_ENV)
            && !mount.is_empty()
        {
            self.monitor.mount_point = PathBuf::from(mount);
        }
        warnings
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.history_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.monitor.period_ms == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.alerts.raise_after == 0 {
            return Err(ConfigError::Invalid(
                "alerts.raise_after must be at least 1".into(),
            ));
        }
        if self.output.ui_queue_depth == 0 {
            return Err(ConfigError::Invalid(
                "output.ui_queue_depth must be at least 1".into(),
            ));
        }
        self.thresholds.validate()
    }
}
