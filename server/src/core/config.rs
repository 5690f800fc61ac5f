use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_PUSH_BATCH, DEFAULT_PUSH_INTERVAL_MS,
    DEFAULT_SWEEP_INTERVAL_MS,
};

// =============================================================================
// Datastore Backend Enum
// =============================================================================

/// Datastore backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreBackendType {
    #[default]
    Memory,
    Redis,
}

impl fmt::Display for DatastoreBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatastoreBackendType::Memory => write!(f, "memory"),
            DatastoreBackendType::Redis => write!(f, "redis"),
        }
    }
}

// =============================================================================
// Resolved Config Structs
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Redis connection configuration
#[derive(Debug, Clone, Default)]
pub struct RedisConfig {
    /// `host:port`
    pub addr: String,
    pub db: i64,
    pub password: Option<String>,
    pub connect_timeout_secs: Option<u64>,
}

/// Datastore configuration
#[derive(Debug, Clone, Default)]
pub struct DatastoreConfig {
    pub backend: DatastoreBackendType,
    pub redis: Option<RedisConfig>,
}

/// Deadline sweeper configuration
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval_ms: u64,
}

/// Push deliverer configuration
#[derive(Debug, Clone)]
pub struct PushDeliveryConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub batch_size: usize,
}

/// Fully resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub datastore: DatastoreConfig,
    pub sweeper: SweeperConfig,
    pub push: PushDeliveryConfig,
    pub debug: bool,
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Redis configuration section (nested under datastore)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RedisFileConfig {
    /// Redis address as `host:port`
    pub addr: Option<String>,
    /// Database index (default: 0)
    pub db: Option<i64>,
    /// Password for authentication
    pub password: Option<String>,
    /// Connection timeout in seconds
    pub connect_timeout_secs: Option<u64>,
}

/// Datastore configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatastoreFileConfig {
    /// Datastore backend: memory (default) or redis
    pub backend: Option<DatastoreBackendType>,
    /// Redis-specific configuration; its presence selects the Redis
    /// backend when `backend` is not set explicitly
    pub redis: Option<RedisFileConfig>,
}

/// Sweeper configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SweeperFileConfig {
    pub interval_ms: Option<u64>,
}

/// Push delivery configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PushFileConfig {
    pub enabled: Option<bool>,
    pub interval_ms: Option<u64>,
    pub batch_size: Option<usize>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub datastore: Option<DatastoreFileConfig>,
    pub sweeper: Option<SweeperFileConfig>,
    pub push: Option<PushFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Local directory config OR CLI-specified config path
    /// 3. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let config_path = if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        let file_config = match config_path {
            Some(path) => {
                let config = FileConfig::load_from_file(&path)?;
                config.warn_unknown_fields();
                tracing::debug!(path = %path.display(), "Config file loaded");
                config
            }
            None => FileConfig::default(),
        };

        let file_server = file_config.server.unwrap_or_default();
        let file_datastore = file_config.datastore.unwrap_or_default();
        let file_sweeper = file_config.sweeper.unwrap_or_default();
        let file_push = file_config.push.unwrap_or_default();

        // Layer configs: defaults -> file config -> CLI/env overrides
        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        // Datastore: an explicit backend wins; otherwise the presence of a
        // redis section (file or CLI) selects Redis, absence selects memory
        let file_redis = file_datastore.redis.unwrap_or_default();
        let redis_addr = cli.redis_addr.clone().or(file_redis.addr);
        let backend = cli
            .datastore_backend
            .or(file_datastore.backend)
            .unwrap_or(if redis_addr.is_some() {
                DatastoreBackendType::Redis
            } else {
                DatastoreBackendType::Memory
            });

        let redis = match backend {
            DatastoreBackendType::Memory => None,
            DatastoreBackendType::Redis => {
                let addr = redis_addr
                    .context("Redis backend selected but no redis address configured")?;
                Some(RedisConfig {
                    addr,
                    db: cli.redis_db.or(file_redis.db).unwrap_or(0),
                    password: cli.redis_password.clone().or(file_redis.password),
                    connect_timeout_secs: file_redis.connect_timeout_secs,
                })
            }
        };

        let sweeper = SweeperConfig {
            interval_ms: cli
                .sweep_interval_ms
                .or(file_sweeper.interval_ms)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS),
        };

        let push = PushDeliveryConfig {
            enabled: if cli.no_push {
                false
            } else {
                file_push.enabled.unwrap_or(true)
            },
            interval_ms: cli
                .push_interval_ms
                .or(file_push.interval_ms)
                .unwrap_or(DEFAULT_PUSH_INTERVAL_MS),
            batch_size: cli
                .push_batch
                .or(file_push.batch_size)
                .unwrap_or(DEFAULT_PUSH_BATCH),
        };

        let debug = cli.debug || file_config.debug.unwrap_or(false);

        Ok(Self {
            server: ServerConfig { host, port },
            datastore: DatastoreConfig { backend, redis },
            sweeper,
            push,
            debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::load(&CliConfig::default()).unwrap();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.datastore.backend, DatastoreBackendType::Memory);
        assert!(config.datastore.redis.is_none());
        assert_eq!(config.sweeper.interval_ms, DEFAULT_SWEEP_INTERVAL_MS);
        assert!(config.push.enabled);
        assert!(!config.debug);
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"host": "0.0.0.0", "port": 9000}}}}"#
        )
        .unwrap();

        let cli = CliConfig {
            port: Some(9100),
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn test_redis_section_selects_redis_backend() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"datastore": {{"redis": {{"addr": "localhost:6379", "db": 3}}}}}}"#
        )
        .unwrap();

        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.datastore.backend, DatastoreBackendType::Redis);
        let redis = config.datastore.redis.unwrap();
        assert_eq!(redis.addr, "localhost:6379");
        assert_eq!(redis.db, 3);
    }

    #[test]
    fn test_redis_backend_without_addr_fails() {
        let cli = CliConfig {
            datastore_backend: Some(DatastoreBackendType::Redis),
            ..Default::default()
        };
        assert!(AppConfig::load(&cli).is_err());
    }

    #[test]
    fn test_missing_config_file_fails() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/courier.json")),
            ..Default::default()
        };
        assert!(AppConfig::load(&cli).is_err());
    }

    #[test]
    fn test_no_push_flag_disables_push() {
        let cli = CliConfig {
            no_push: true,
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert!(!config.push.enabled);
    }
}
