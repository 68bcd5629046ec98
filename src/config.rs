//! Configuration types for remote-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Download behavior configuration (directories, concurrency, transfer tuning)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    #[schema(value_type = String)]
    pub download_dir: PathBuf,

    /// Number of worker loops, i.e. simultaneous transfers (default: 5)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Write buffer size in bytes (default: 1 MiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Continue from existing partial files with a Range request (default: true)
    #[serde(default = "default_true")]
    pub resume_support: bool,

    /// Move completed files into a per-category subdirectory (default: true)
    #[serde(default = "default_true")]
    pub category_subdirs: bool,

    /// User-Agent sent when a task has no override
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Total timeout for one transfer attempt (default: 60 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    #[schema(value_type = f64)]
    pub timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            chunk_size: default_chunk_size(),
            resume_support: true,
            category_subdirs: true,
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

/// Retry configuration for transient transfer failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Attempts before a task is marked permanently failed (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit; attempt `n` waits `base_delay * n` (default: 5 seconds)
    #[serde(default = "default_base_delay", with = "duration_serde")]
    #[schema(value_type = f64)]
    pub base_delay: Duration,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            jitter: false,
        }
    }
}

/// Snapshot persistence configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Directory holding the snapshot files (default: "./state")
    #[serde(default = "default_state_dir")]
    #[schema(value_type = String)]
    pub state_dir: PathBuf,

    /// Interval between active-task snapshots (default: 30 seconds)
    #[serde(default = "default_state_save_interval", with = "duration_serde")]
    #[schema(value_type = f64)]
    pub state_save_interval: Duration,

    /// Persist finished tasks (default: true)
    #[serde(default = "default_true")]
    pub save_history: bool,

    /// History entries kept before the oldest are evicted (default: 1000)
    #[serde(default = "default_history_max_count")]
    pub history_max_count: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            state_save_interval: default_state_save_interval(),
            save_history: true,
            history_max_count: default_history_max_count(),
        }
    }
}

/// Subscriber notification configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationConfig {
    /// Minimum spacing between progress notifications for one task (default: 3 seconds)
    #[serde(default = "default_notify_interval", with = "duration_serde")]
    #[schema(value_type = f64)]
    pub notify_interval: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            notify_interval: default_notify_interval(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Log output configuration (used by the binary)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Main configuration for the download manager
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Transfer behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Retry budget and backoff
    #[serde(default)]
    pub retry: RetryConfig,

    /// Snapshot storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Subscriber notifications
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,

    /// Logging
    #[serde(default)]
    pub logging: LogConfig,
}

impl Config {
    /// Load a configuration file.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;

        let config: Config = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&raw).map_err(|e| Error::Config {
                message: format!("invalid JSON in {}: {}", path.display(), e),
                key: None,
            })?
        } else {
            toml::from_str(&raw).map_err(|e| Error::Config {
                message: format!("invalid TOML in {}: {}", path.display(), e),
                key: None,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the manager cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".into(),
                key: Some("max_concurrent_downloads".into()),
            });
        }
        if self.download.chunk_size == 0 {
            return Err(Error::Config {
                message: "chunk_size must be at least 1".into(),
                key: Some("chunk_size".into()),
            });
        }
        if self.persistence.history_max_count == 0 {
            return Err(Error::Config {
                message: "history_max_count must be at least 1".into(),
                key: Some("history_max_count".into()),
            });
        }
        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_concurrent() -> usize {
    5
}

fn default_chunk_size() -> usize {
    1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("remote-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

fn default_state_save_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_history_max_count() -> usize {
    1000
}

fn default_notify_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

// Durations are written as (possibly fractional) seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
