//! Environment-driven configuration, loaded once at startup.

use std::time::Duration;

/// Which history backend the server wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    /// Redis-backed history store.
    Prod,
    /// In-memory history store, for tests and bootstrap runs.
    Test,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub env: RuntimeEnv,
    pub redis_url: String,
    pub host: String,
    pub port: u16,
    /// Maximum accepted inbound message length, in characters. Enforced at
    /// the WebSocket route, not inside the delivery engine.
    pub max_message_length: usize,
    /// Default number of records returned by a history read.
    pub history_limit: usize,
    /// Sliding retention window for stored history, in minutes.
    pub retention_minutes: u64,
    pub ws_ping_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let env = match env_or("ENV", "prod").as_str() {
            "test" => RuntimeEnv::Test,
            _ => RuntimeEnv::Prod,
        };

        Self {
            env,
            redis_url: env_or("REDIS_URL", "redis://redis:6379/0"),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("SERVER_PORT", 8000),
            max_message_length: env_parse("MAX_MESSAGE_LENGTH", 1000),
            history_limit: env_parse("CHAT_HISTORY_LIMIT", 50),
            retention_minutes: env_parse("MESSAGE_RETENTION_MINUTES", 30),
            ws_ping_interval: Duration::from_secs(env_parse("WEBSOCKET_PING_INTERVAL", 20)),
        }
    }

    /// Retention window converted to seconds at the store boundary.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_minutes * 60)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_converts_minutes_to_seconds() {
        let config = Config {
            env: RuntimeEnv::Test,
            redis_url: String::new(),
            host: String::new(),
            port: 0,
            max_message_length: 1000,
            history_limit: 50,
            retention_minutes: 30,
            ws_ping_interval: Duration::from_secs(20),
        };
        assert_eq!(config.retention(), Duration::from_secs(1800));
    }
}
