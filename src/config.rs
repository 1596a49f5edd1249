//! Service configuration.

use std::time::Duration;

use clap::Parser;

/// Real-time orders service command line arguments.
#[derive(Debug, Parser)]
#[command(name = "realtime-orders")]
#[command(about = "Real-time order tracking with live WebSocket fan-out")]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Minimum number of pooled connections to maintain.
    #[arg(long, default_value_t = 2)]
    pub pool_min_connections: u32,

    /// Maximum number of pooled connections to allow.
    #[arg(long, default_value_t = 10)]
    pub pool_max_connections: u32,

    /// Timeout (ms) when acquiring a pooled connection.
    #[arg(long, default_value_t = 60_000)]
    pub pool_acquire_timeout_ms: u64,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on for HTTP requests.
    pub listen_addr: String,
    /// PostgreSQL connection URL, also used by the change listener.
    pub database_url: String,
    /// Minimum number of pooled connections to maintain.
    pub pool_min_connections: u32,
    /// Maximum number of pooled connections to allow.
    pub pool_max_connections: u32,
    /// Timeout when acquiring a pooled connection.
    pub pool_acquire_timeout: Duration,
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            listen_addr: args.listen.clone(),
            database_url: args.database_url.clone(),
            pool_min_connections: args.pool_min_connections,
            pool_max_connections: args.pool_max_connections,
            pool_acquire_timeout: Duration::from_millis(args.pool_acquire_timeout_ms),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "postgres://localhost/orders".to_string(),
            pool_min_connections: 2,
            pool_max_connections: 10,
            pool_acquire_timeout: Duration::from_secs(60),
        }
    }
}
