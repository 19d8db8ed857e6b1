//! Layered daemon settings
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/robot-master.toml`
//! 3. `config/environments/{ROBOT_ENVIRONMENT}.toml`
//! 4. the file given with `--config`
//! 5. `ROBOT__SECTION__KEY` environment variables

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use robot_master_core::application::constants::{
    DEFAULT_DISPATCH_INTERVAL, DEFAULT_PENDING_LIMIT,
};
use robot_master_core::error::{AppError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const BASE_CONFIG: &str = "config/robot-master";
const ENVIRONMENTS_DIR: &str = "config/environments";
const ENVIRONMENT_VAR: &str = "ROBOT_ENVIRONMENT";
const DEFAULT_ENVIRONMENT: &str = "development";
const ENV_PREFIX: &str = "ROBOT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub workflow: WorkflowSettings,
    pub queue: QueueSettings,
    pub graphs: GraphSettings,
    pub dispatch: DispatchSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1/workflow/".to_string(),
            timeout_secs: 60,
        }
    }
}

impl WorkflowSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    Redis,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub backend: QueueBackend,
    pub redis_url: String,
    pub redis_namespace: String,
    pub sqlite_path: String,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            backend: QueueBackend::Redis,
            redis_url: "redis://127.0.0.1:6379/".to_string(),
            redis_namespace: "resque:development".to_string(),
            sqlite_path: "~/.robot-master/queues.db".to_string(),
        }
    }
}

impl QueueSettings {
    /// SQLite database path with `~` expanded
    pub fn sqlite_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.sqlite_path).into_owned())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    pub root: String,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            root: "config/workflows".to_string(),
        }
    }
}

impl GraphSettings {
    pub fn root(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.root).into_owned())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub pending_limit: usize,
    pub interval_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            pending_limit: DEFAULT_PENDING_LIMIT,
            interval_secs: DEFAULT_DISPATCH_INTERVAL.as_secs(),
        }
    }
}

impl DispatchSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `stdout`, `stderr` or a file path
    pub target: String,
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            target: "stdout".to_string(),
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Settings {
    /// Load settings from every source
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());

        let mut builder = Config::builder()
            .add_source(File::with_name(BASE_CONFIG).required(false))
            .add_source(
                File::with_name(&format!("{}/{}", ENVIRONMENTS_DIR, environment)).required(false),
            );

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()
            .and_then(Config::try_deserialize::<Settings>)
            .map_err(|e| AppError::Config(e.to_string()))?
            .validate()
    }

    /// Reject values the dispatcher cannot run with
    pub fn validate(self) -> Result<Self> {
        if self.dispatch.interval_secs == 0 {
            return Err(AppError::Config(
                "dispatch.interval_secs must be at least 1".to_string(),
            ));
        }
        if self.dispatch.pending_limit == 0 {
            return Err(AppError::Config(
                "dispatch.pending_limit must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}
