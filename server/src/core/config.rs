//! Layered application configuration.
//!
//! Precedence, lowest to highest: built-in defaults, an optional JSON config
//! file, environment variables, CLI flags. `clap`'s `env` attribute means the
//! CLI layer already absorbs environment variables, so [`AppConfig::load`]
//! only has to merge two layers: the optional file, then the parsed CLI.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_FANOUT_TIMEOUT_MS, DEFAULT_HOST,
    DEFAULT_MESSAGE_PAGE_LIMIT, DEFAULT_PORT, DEFAULT_READY_TIMEOUT_MS, DEFAULT_REDIS_URL,
};

// =============================================================================
// Database Backend
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Memory,
    Postgres,
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

// =============================================================================
// Pub/Sub Backend
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PubSubBackend {
    #[default]
    Memory,
    Redis,
}

impl fmt::Display for PubSubBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

// =============================================================================
// On-disk config file (all fields optional; merged over defaults)
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    cors_origins: Option<Vec<String>>,
    database_backend: Option<DatabaseBackend>,
    postgres_url: Option<String>,
    pubsub_backend: Option<PubSubBackend>,
    redis_url: Option<String>,
    fanout_timeout_ms: Option<u64>,
    ready_timeout_ms: Option<u64>,
}

impl FileConfig {
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

// =============================================================================
// Resolved (merged) configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub statement_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub postgres: Option<PostgresConfig>,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct PubSubConfig {
    pub backend: PubSubBackend,
    pub redis: Option<RedisConfig>,
}

#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub fanout_timeout_ms: u64,
    pub ready_timeout_ms: u64,
    pub default_message_page_limit: i64,
}

/// Final merged application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub pubsub: PubSubConfig,
    pub room: RoomConfig,
}

impl AppConfig {
    /// Load configuration from all sources.
    ///
    /// Priority (lowest to highest): defaults, `~/.sharechat/sharechat.json`
    /// (or the path given via `--config`/`SHARECHAT_CONFIG`), CLI/env.
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();

        let config_path = cli.config.clone().or_else(default_config_path);
        if let Some(path) = config_path
            && path.exists()
        {
            file_config = FileConfig::load_from_file(&path)?;
        }

        let host = cli
            .host
            .clone()
            .or(file_config.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file_config.port).unwrap_or(DEFAULT_PORT);

        let cors_origins = if !cli.cors_origin.is_empty() {
            cli.cors_origin.clone()
        } else {
            file_config.cors_origins.unwrap_or_default()
        };

        let database_backend = cli
            .database_backend
            .or(file_config.database_backend)
            .unwrap_or_default();
        let postgres_url = cli.postgres_url.clone().or(file_config.postgres_url);

        let postgres = match database_backend {
            DatabaseBackend::Postgres => {
                let url = postgres_url.ok_or_else(|| {
                    anyhow::anyhow!(
                        "--postgres-url (or SHARECHAT_POSTGRES_URL) is required when --database-backend=postgres"
                    )
                })?;
                Some(PostgresConfig {
                    url,
                    max_connections: super::constants::POSTGRES_DEFAULT_MAX_CONNECTIONS,
                    min_connections: super::constants::POSTGRES_DEFAULT_MIN_CONNECTIONS,
                    acquire_timeout_secs: super::constants::POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS,
                    idle_timeout_secs: super::constants::POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
                    max_lifetime_secs: super::constants::POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
                    statement_timeout_secs: super::constants::POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS,
                })
            }
            DatabaseBackend::Memory => None,
        };

        let pubsub_backend = cli
            .pubsub_backend
            .or(file_config.pubsub_backend)
            .unwrap_or_default();
        let redis_url = cli
            .redis_url
            .clone()
            .or(file_config.redis_url)
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let redis = match pubsub_backend {
            PubSubBackend::Redis => Some(RedisConfig { url: redis_url }),
            PubSubBackend::Memory => None,
        };

        let fanout_timeout_ms = file_config
            .fanout_timeout_ms
            .unwrap_or(DEFAULT_FANOUT_TIMEOUT_MS);
        let ready_timeout_ms = file_config
            .ready_timeout_ms
            .unwrap_or(DEFAULT_READY_TIMEOUT_MS);

        Ok(Self {
            server: ServerConfig { host, port },
            cors: CorsConfig {
                allowed_origins: cors_origins,
            },
            database: DatabaseConfig {
                backend: database_backend,
                postgres,
            },
            pubsub: PubSubConfig {
                backend: pubsub_backend,
                redis,
            },
            room: RoomConfig {
                fanout_timeout_ms,
                ready_timeout_ms,
                default_message_page_limit: DEFAULT_MESSAGE_PAGE_LIMIT,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> CliConfig {
        CliConfig::default()
    }

    #[test]
    fn defaults_apply_when_nothing_set() {
        let config = AppConfig::load(&base_cli()).unwrap();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.database.backend, DatabaseBackend::Memory);
        assert!(config.database.postgres.is_none());
    }

    #[test]
    fn cli_overrides_defaults() {
        let mut cli = base_cli();
        cli.host = Some("0.0.0.0".to_string());
        cli.port = Some(9000);
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn postgres_backend_requires_url() {
        let mut cli = base_cli();
        cli.database_backend = Some(DatabaseBackend::Postgres);
        let result = AppConfig::load(&cli);
        assert!(result.is_err());
    }

    #[test]
    fn postgres_backend_with_url_succeeds() {
        let mut cli = base_cli();
        cli.database_backend = Some(DatabaseBackend::Postgres);
        cli.postgres_url = Some("postgres://localhost/sharechat".to_string());
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(
            config.database.postgres.unwrap().url,
            "postgres://localhost/sharechat"
        );
    }

    #[test]
    fn file_config_fills_in_unset_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sharechat.json");
        fs::write(&path, r#"{"host": "10.0.0.1", "port": 7000}"#).unwrap();

        let mut cli = base_cli();
        cli.config = Some(path);
        let config = AppConfig::load(&cli).unwrap();

        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn cli_takes_precedence_over_file_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sharechat.json");
        fs::write(&path, r#"{"host": "10.0.0.1", "port": 7000}"#).unwrap();

        let mut cli = base_cli();
        cli.config = Some(path);
        cli.host = Some("192.168.1.1".to_string());
        let config = AppConfig::load(&cli).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 7000);
    }
}
