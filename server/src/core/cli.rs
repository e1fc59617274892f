use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::{DatabaseBackend, PubSubBackend};
use super::constants::{
    ENV_CONFIG, ENV_CORS_ORIGINS, ENV_DATABASE_BACKEND, ENV_DEBUG, ENV_HOST, ENV_PORT,
    ENV_POSTGRES_URL, ENV_PUBSUB_BACKEND, ENV_REDIS_URL,
};

#[derive(Parser)]
#[command(name = "sharechat")]
#[command(version, about = "Multi-room chat server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Room/message store backend (memory or postgres)
    #[arg(long, global = true, env = ENV_DATABASE_BACKEND, value_parser = parse_database_backend)]
    pub database_backend: Option<DatabaseBackend>,

    /// PostgreSQL connection URL (when using the postgres backend)
    #[arg(long, global = true, env = ENV_POSTGRES_URL)]
    pub postgres_url: Option<String>,

    /// Pub/sub backend (memory or redis)
    #[arg(long, global = true, env = ENV_PUBSUB_BACKEND, value_parser = parse_pubsub_backend)]
    pub pubsub_backend: Option<PubSubBackend>,

    /// Redis connection URL (when using the redis pub/sub backend)
    #[arg(long, global = true, env = ENV_REDIS_URL)]
    pub redis_url: Option<String>,

    /// Allowed CORS origin. Repeatable.
    #[arg(long = "cors-origin", global = true, env = ENV_CORS_ORIGINS, value_delimiter = ',')]
    pub cors_origin: Vec<String>,
}

fn parse_database_backend(s: &str) -> Result<DatabaseBackend, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(DatabaseBackend::Memory),
        "postgres" | "postgresql" => Ok(DatabaseBackend::Postgres),
        _ => Err(format!(
            "Invalid database backend '{}'. Valid options: memory, postgres",
            s
        )),
    }
}

fn parse_pubsub_backend(s: &str) -> Result<PubSubBackend, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(PubSubBackend::Memory),
        "redis" => Ok(PubSubBackend::Redis),
        _ => Err(format!(
            "Invalid pub/sub backend '{}'. Valid options: memory, redis",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
}

/// Configuration derived from CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub database_backend: Option<DatabaseBackend>,
    pub postgres_url: Option<String>,
    pub pubsub_backend: Option<PubSubBackend>,
    pub redis_url: Option<String>,
    pub cors_origin: Vec<String>,
}

/// Parse CLI arguments and return config with command.
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        debug: cli.debug,
        config: cli.config,
        database_backend: cli.database_backend,
        postgres_url: cli.postgres_url,
        pubsub_backend: cli.pubsub_backend,
        redis_url: cli.redis_url,
        cors_origin: cli.cors_origin,
    };
    (config, cli.command)
}
