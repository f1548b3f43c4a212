//! Configuration management for Jellyfin Fetcher
//!
//! Tunables live in a TOML file with one section per component. A commented
//! default file is written on first run, and every section falls back to its
//! defaults when missing. Credentials and selection state are not part of
//! this file; they live in the session record (see [`crate::app::session`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::navigator::WalkLimits;
use crate::app::{ClientConfig, NavigatorConfig, QueueConfig};
use crate::constants::{files, http, navigator, queue};
use crate::errors::{AppError, ConfigError, ConfigResult, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Column browser settings
    pub navigator: NavigatorConfigToml,
    /// Download queue settings
    pub queue: QueueConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Catalog request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit for catalog requests (requests per second)
    pub rate_limit_rps: u32,
    /// Maximum ids per metadata request
    pub metadata_chunk_size: usize,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: http::DEFAULT_RATE_LIMIT_RPS,
            metadata_chunk_size: http::METADATA_CHUNK_SIZE,
        }
    }
}

/// TOML-friendly navigator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfigToml {
    /// Maximum number of columns
    pub max_depth: usize,
    /// Maximum descendants touched by one folder toggle
    pub propagation_node_limit: usize,
    /// Maximum folder depth walked by one folder toggle
    pub propagation_depth_limit: usize,
    /// Concurrent children fetches during a folder walk
    pub fetch_concurrency: usize,
}

impl Default for NavigatorConfigToml {
    fn default() -> Self {
        Self {
            max_depth: navigator::MAX_COLUMN_DEPTH,
            propagation_node_limit: navigator::PROPAGATION_NODE_LIMIT,
            propagation_depth_limit: navigator::PROPAGATION_DEPTH_LIMIT,
            fetch_concurrency: navigator::PROPAGATION_FETCH_CONCURRENCY,
        }
    }
}

/// TOML-friendly queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfigToml {
    /// Progress tick interval
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    /// Automatic retries of a failed transfer
    pub max_retries: u32,
    /// Base delay before the first retry
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Jitter factor applied to retry delays (0.0-1.0)
    pub retry_jitter: f64,
}

impl Default for QueueConfigToml {
    fn default() -> Self {
        Self {
            tick_interval: queue::TICK_INTERVAL,
            max_retries: queue::MAX_RETRIES,
            retry_delay: queue::RETRY_DELAY,
            retry_jitter: queue::RETRY_JITTER_FACTOR,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Log file used by the terminal UI (default: next to the config file)
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            log_file: None,
        }
    }
}

impl LoggingConfig {
    /// Where the terminal UI writes its log
    pub fn resolved_log_file(&self) -> ConfigResult<PathBuf> {
        match &self.log_file {
            Some(path) => Ok(path.clone()),
            None => Ok(app_config_dir()?.join(files::LOG_FILE_NAME)),
        }
    }
}

/// `<config dir>/jellyfin-fetcher`
pub fn app_config_dir() -> ConfigResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(files::APP_DIR_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

impl AppConfig {
    /// Convert to the runtime configuration of each component
    pub fn to_runtime_config(&self) -> (ClientConfig, NavigatorConfig, QueueConfig) {
        (
            self.client.to_runtime_config(),
            self.navigator.to_runtime_config(),
            self.queue.to_runtime_config(),
        )
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Self::load_from_file(&path).await?
            }
            None => {
                let path = Self::default_config_path()?;
                if path.exists() {
                    Self::load_from_file(&path).await?
                } else {
                    debug!("No config file at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Initialize configuration on first run
    ///
    /// Creates a commented default config file if none exists and returns
    /// its path when it was just created.
    pub async fn initialize_first_run() -> Result<Option<PathBuf>> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            return Ok(None);
        }

        info!("Creating default configuration file...");

        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::generic(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tokio::fs::write(&config_path, Self::generate_default_config_content())
            .await
            .map_err(|e| {
                AppError::generic(format!(
                    "Failed to write config file {}: {}",
                    config_path.display(),
                    e
                ))
            })?;

        Ok(Some(config_path))
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        Ok(app_config_dir()?.join(files::CONFIG_FILE_NAME))
    }

    /// Check every value for sanity
    pub fn validate(&self) -> ConfigResult<()> {
        fn positive(field: &str, value: usize) -> ConfigResult<()> {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: "Must be greater than zero".to_string(),
                });
            }
            Ok(())
        }

        positive("client.rate_limit_rps", self.client.rate_limit_rps as usize)?;
        positive("client.metadata_chunk_size", self.client.metadata_chunk_size)?;
        positive(
            "client.request_timeout_secs",
            self.client.request_timeout_secs as usize,
        )?;
        positive("navigator.max_depth", self.navigator.max_depth)?;
        positive(
            "navigator.propagation_node_limit",
            self.navigator.propagation_node_limit,
        )?;
        positive(
            "navigator.propagation_depth_limit",
            self.navigator.propagation_depth_limit,
        )?;
        positive("navigator.fetch_concurrency", self.navigator.fetch_concurrency)?;

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: "Expected one of: error, warn, info, debug, trace".to_string(),
            });
        }

        self.queue.to_runtime_config().validate()
    }

    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::InvalidFormat)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        format!(
            r#"# Jellyfin Fetcher Configuration
# This file was automatically generated on first run.
# Credentials are not stored here; use `jellyfin_fetcher config setup`.

[client]
# Catalog request timeout and connection setup timeout
request_timeout_secs = {}
connect_timeout_secs = {}
# Catalog requests per second
rate_limit_rps = {}
# Maximum ids per metadata request
metadata_chunk_size = {}

[navigator]
# Maximum number of columns
max_depth = {}
# Bounds on one folder selection
propagation_node_limit = {}
propagation_depth_limit = {}
fetch_concurrency = {}

[queue]
tick_interval = "{}ms"
# Automatic retries of a failed download
max_retries = {}
# Delay before the first retry, doubled for each later one
retry_delay = "{}s"
retry_jitter = {}

[logging]
level = "warn"  # error, warn, info, debug, trace
# log_file = "/path/to/jellyfin-fetcher.log"  # Used while the terminal UI runs
"#,
            http::DEFAULT_TIMEOUT.as_secs(),
            http::CONNECT_TIMEOUT.as_secs(),
            http::DEFAULT_RATE_LIMIT_RPS,
            http::METADATA_CHUNK_SIZE,
            navigator::MAX_COLUMN_DEPTH,
            navigator::PROPAGATION_NODE_LIMIT,
            navigator::PROPAGATION_DEPTH_LIMIT,
            navigator::PROPAGATION_FETCH_CONCURRENCY,
            queue::TICK_INTERVAL.as_millis(),
            queue::MAX_RETRIES,
            queue::RETRY_DELAY.as_secs(),
            queue::RETRY_JITTER_FACTOR,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
            metadata_chunk_size: self.metadata_chunk_size,
            ..ClientConfig::default()
        }
    }
}

impl NavigatorConfigToml {
    /// Convert to runtime NavigatorConfig
    pub fn to_runtime_config(&self) -> NavigatorConfig {
        NavigatorConfig {
            max_depth: self.max_depth,
            walk: WalkLimits {
                max_nodes: self.propagation_node_limit,
                max_depth: self.propagation_depth_limit,
                concurrency: self.fetch_concurrency,
            },
        }
    }
}

impl QueueConfigToml {
    /// Convert to runtime QueueConfig
    pub fn to_runtime_config(&self) -> QueueConfig {
        QueueConfig {
            tick_interval: self.tick_interval,
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            retry_jitter: self.retry_jitter,
            ..QueueConfig::default()
        }
    }
}
