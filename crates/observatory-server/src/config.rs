//! Environment-variable configuration.
//!
//! Everything is `OBSERVATORY_*`; a local `.env` file is honored in
//! development. Unset variables fall back to the documented defaults.

use std::time::Duration;

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// World snapshot path (`OBSERVATORY_STATE_FILE`).
    pub state_file: String,
    /// Event ledger path (`OBSERVATORY_LEDGER_FILE`).
    pub ledger_file: String,
    /// Seconds per tick (`OBSERVATORY_TICK_DURATION`).
    pub tick_duration: Duration,
    /// Bind host (`OBSERVATORY_HOST`).
    pub host: String,
    /// Bind port (`OBSERVATORY_PORT`).
    pub port: u16,
    /// Public domain for claim URLs (`OBSERVATORY_DOMAIN`).
    pub domain: String,
    /// Verbose logging default (`OBSERVATORY_DEBUG`).
    pub debug: bool,
}

impl ServerConfig {
    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Self {
        let tick_seconds = env_or("OBSERVATORY_TICK_DURATION", "5.0")
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .unwrap_or(5.0);

        Self {
            state_file: env_or("OBSERVATORY_STATE_FILE", "world_state.json"),
            ledger_file: env_or("OBSERVATORY_LEDGER_FILE", "event_ledger.jsonl"),
            tick_duration: Duration::from_secs_f64(tick_seconds),
            host: env_or("OBSERVATORY_HOST", "0.0.0.0"),
            port: env_or("OBSERVATORY_PORT", "8000").parse().unwrap_or(8000),
            domain: env_or("OBSERVATORY_DOMAIN", "localhost:8000"),
            debug: env_or("OBSERVATORY_DEBUG", "false").eq_ignore_ascii_case("true"),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}
