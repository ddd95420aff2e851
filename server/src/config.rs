//! Runtime configuration for the server.

use crate::error::ConfigError;
use crate::game::MatchRules;
use std::fmt;
use std::time::Duration;

/// Environment variable holding the shared secret.
pub const SECRET_ENV: &str = "PONG_SECRET";

pub const DEFAULT_STREAM_PORT: u16 = 12345;
pub const DEFAULT_SOCKET_PORT: u16 = 8080;
pub const DEFAULT_TICK_RATE: u32 = 60;

/// How long a stream client has to answer the secret prompt.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval of the phases that wait on players.
pub const WAIT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct ServerConfig {
    pub secret: String,
    pub stream_addr: String,
    pub socket_addr: String,
    pub tick_duration: Duration,
    pub auth_timeout: Duration,
    pub wait_interval: Duration,
    pub rules: MatchRules,
}

impl ServerConfig {
    /// Configuration listening on all default ports of `host`.
    pub fn new(secret: impl Into<String>, host: &str) -> Self {
        Self {
            secret: secret.into(),
            stream_addr: format!("{}:{}", host, DEFAULT_STREAM_PORT),
            socket_addr: format!("{}:{}", host, DEFAULT_SOCKET_PORT),
            tick_duration: tick_duration(DEFAULT_TICK_RATE),
            auth_timeout: AUTH_TIMEOUT,
            wait_interval: WAIT_INTERVAL,
            rules: MatchRules::default(),
        }
    }
}

// The secret never reaches the logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("secret", &"<redacted>")
            .field("stream_addr", &self.stream_addr)
            .field("socket_addr", &self.socket_addr)
            .field("tick_duration", &self.tick_duration)
            .field("auth_timeout", &self.auth_timeout)
            .field("wait_interval", &self.wait_interval)
            .field("rules", &self.rules)
            .finish()
    }
}

/// Period of one simulation tick at `tick_rate` Hz.
pub fn tick_duration(tick_rate: u32) -> Duration {
    Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64)
}

/// Reads the shared secret from [`SECRET_ENV`].
pub fn secret_from_env() -> Result<String, ConfigError> {
    validate_secret(std::env::var(SECRET_ENV).ok())
}

pub fn validate_secret(value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ => Err(ConfigError::MissingSecret(SECRET_ENV)),
    }
}
