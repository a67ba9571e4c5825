use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// `DATABASE_URL` value that selects the in-process store.
pub const MEMORY_STORE_URL: &str = "memory";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `None` leaves the statistics endpoints without a store.
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub streamer_keys: String,
    pub admin_keys: String,
    pub leaderboard_cache_ttl: Duration,
    pub metadata_cache_ttl: Duration,
    pub schema_probe_ttl: Duration,
    pub response_cache_max_entries: u64,
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {value}")),
        _ => Ok(default),
    }
}

fn secs_or(name: &str, default: u64) -> Result<Duration> {
    env_or(name, default).map(Duration::from_secs)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("Cannot load PORT env variable")?
                .parse()
                .context("PORT must be a number")?,
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            run_migrations: env_or("RUN_MIGRATIONS", true)?,
            streamer_keys: std::env::var("STREAMER_KEYS").unwrap_or_default(),
            admin_keys: std::env::var("ADMIN_KEYS").unwrap_or_default(),
            leaderboard_cache_ttl: secs_or("LEADERBOARD_CACHE_TTL_SECS", 30)?,
            metadata_cache_ttl: secs_or("METADATA_CACHE_TTL_SECS", 300)?,
            schema_probe_ttl: secs_or("SCHEMA_PROBE_TTL_SECS", 60)?,
            response_cache_max_entries: env_or("RESPONSE_CACHE_MAX_ENTRIES", 2048)?,
        })
    }
}
