use std::env;
use std::str::FromStr;

use match_events_core::events::listener::DEFAULT_CHANNEL;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Maximum database connections in the pool.
    pub db_max_connections: u32,
    /// Minimum database connections in the pool.
    pub db_min_connections: u32,
    /// Change feed channel capacity.
    pub event_bus_capacity: usize,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
    /// Postgres channel the `match_events` trigger notifies on.
    pub notify_channel: String,
    /// Segment width used when a request does not give one.
    pub default_interval_minutes: f64,
    /// Match length used when a request does not give one.
    pub default_match_duration_minutes: f64,
    /// Matches nobody asked about for this long are stopped.
    pub live_match_idle_secs: u64,
    /// Upper bound on matches followed at once; the least recently used
    /// one is stopped to make room.
    pub max_live_matches: usize,
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT", "u16", "3030")?,
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", "u32", "20")?,
            db_min_connections: parse_var(&lookup, "DB_MIN_CONNECTIONS", "u32", "5")?,
            event_bus_capacity: parse_var(&lookup, "EVENT_BUS_CAPACITY", "usize", "1024")?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            notify_channel: lookup("NOTIFY_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            default_interval_minutes: parse_var(&lookup, "DEFAULT_INTERVAL_MINUTES", "number", "5")?,
            default_match_duration_minutes: parse_var(
                &lookup,
                "DEFAULT_MATCH_DURATION_MINUTES",
                "number",
                "90",
            )?,
            live_match_idle_secs: parse_var(&lookup, "LIVE_MATCH_IDLE_SECS", "u64", "300")?,
            max_live_matches: parse_var(&lookup, "MAX_LIVE_MATCHES", "usize", "256")?,
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
impl AppConfig {
    /// Small, database-free settings for router and state tests.
    pub(crate) fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "postgres://unused".to_string(),
            db_max_connections: 1,
            db_min_connections: 0,
            event_bus_capacity: 16,
            log_level: "debug".to_string(),
            notify_channel: DEFAULT_CHANNEL.to_string(),
            default_interval_minutes: 5.0,
            default_match_duration_minutes: 10.0,
            live_match_idle_secs: 300,
            max_live_matches: 16,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
    default: &str,
) -> Result<T, ConfigError> {
    let value = lookup(name).unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value,
    })
}
