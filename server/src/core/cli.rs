use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::config::DatastoreBackendType;
use super::constants::{
    ENV_CONFIG, ENV_DATASTORE_BACKEND, ENV_DEBUG, ENV_HOST, ENV_NO_PUSH, ENV_PORT, ENV_PUSH_BATCH,
    ENV_PUSH_INTERVAL_MS, ENV_REDIS_ADDR, ENV_REDIS_DB, ENV_REDIS_PASSWORD, ENV_SWEEP_INTERVAL_MS,
};

#[derive(Parser)]
#[command(name = "courier")]
#[command(version, about = "Pub/Sub message broker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Enable debug mode (verbose request logging)
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    // Datastore options
    /// Datastore backend (memory or redis)
    #[arg(long, global = true, env = ENV_DATASTORE_BACKEND, value_parser = parse_datastore_backend)]
    pub datastore: Option<DatastoreBackendType>,

    /// Redis address as host:port (selects the redis backend)
    #[arg(long, global = true, env = ENV_REDIS_ADDR)]
    pub redis_addr: Option<String>,

    /// Redis database index
    #[arg(long, global = true, env = ENV_REDIS_DB)]
    pub redis_db: Option<i64>,

    /// Redis password
    #[arg(long, global = true, env = ENV_REDIS_PASSWORD)]
    pub redis_password: Option<String>,

    // Background task options
    /// Deadline sweep interval in milliseconds
    #[arg(long, global = true, env = ENV_SWEEP_INTERVAL_MS)]
    pub sweep_interval_ms: Option<u64>,

    /// Push delivery tick interval in milliseconds
    #[arg(long, global = true, env = ENV_PUSH_INTERVAL_MS)]
    pub push_interval_ms: Option<u64>,

    /// Push delivery batch size per subscription per tick
    #[arg(long, global = true, env = ENV_PUSH_BATCH)]
    pub push_batch: Option<usize>,

    /// Disable push delivery (subscriptions stay pull-only)
    #[arg(long, global = true, env = ENV_NO_PUSH)]
    pub no_push: bool,
}

/// Parse datastore backend from CLI/env string
fn parse_datastore_backend(s: &str) -> Result<DatastoreBackendType, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(DatastoreBackendType::Memory),
        "redis" => Ok(DatastoreBackendType::Redis),
        _ => Err(format!(
            "Unsupported datastore driver '{}'. Valid options: memory, redis",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the broker (default command)
    Start,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub debug: bool,
    pub datastore_backend: Option<DatastoreBackendType>,
    pub redis_addr: Option<String>,
    pub redis_db: Option<i64>,
    pub redis_password: Option<String>,
    pub sweep_interval_ms: Option<u64>,
    pub push_interval_ms: Option<u64>,
    pub push_batch: Option<usize>,
    pub no_push: bool,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        debug: cli.debug,
        datastore_backend: cli.datastore,
        redis_addr: cli.redis_addr,
        redis_db: cli.redis_db,
        redis_password: cli.redis_password,
        sweep_interval_ms: cli.sweep_interval_ms,
        push_interval_ms: cli.push_interval_ms,
        push_batch: cli.push_batch,
        no_push: cli.no_push,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datastore_backend() {
        assert_eq!(
            parse_datastore_backend("memory").unwrap(),
            DatastoreBackendType::Memory
        );
        assert_eq!(
            parse_datastore_backend("Redis").unwrap(),
            DatastoreBackendType::Redis
        );
        assert!(parse_datastore_backend("etcd").is_err());
    }

    #[test]
    fn test_cli_args_parse() {
        let cli = Cli::parse_from([
            "courier",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--redis-addr",
            "localhost:6379",
        ]);
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.redis_addr.as_deref(), Some("localhost:6379"));
    }
}
