//! Configuration, layered the way the original service does: CLI flags take
//! precedence over environment variables, which `clap`'s `env` attribute gives us
//! without a separate `flag` + `env` pass.

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "gophermart")]
pub struct Config {
    /// HTTP bind address.
    #[arg(short = 'a', long, env = "RUN_ADDRESS", default_value = "0.0.0.0:8080")]
    pub run_address: String,

    /// Postgres connection string.
    #[arg(short = 'd', long, env = "DATABASE_URI")]
    pub database_uri: String,

    /// Base URL of the accrual provider.
    #[arg(short = 'r', long, env = "ACCRUAL_SYSTEM_ADDRESS")]
    pub accrual_system_address: String,

    /// Database connection pool size. Should stay above `workers + 2` so the
    /// listener and sweeper are never starved of a connection.
    #[arg(long, env = "WP_CONNS", default_value_t = 12)]
    pub wp_conns: u32,

    /// Number of pipeline workers draining the dispatch queue.
    #[arg(long, env = "WORKERS", default_value_t = 1)]
    pub workers: usize,
}

impl Config {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }
}
