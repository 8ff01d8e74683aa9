//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Bot configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token. When absent the CLI channel runs instead.
    pub bot_token: Option<SecretString>,
    /// Idle lifetime after which a session is swept.
    pub session_ttl: Duration,
    /// Interval between sweep runs.
    pub sweep_interval: Duration,
    /// Hard cap on a single listings lookup.
    pub lookup_timeout: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            session_ttl: Duration::from_secs(1800), // 30 minutes
            sweep_interval: Duration::from_secs(300), // 5 minutes
            lookup_timeout: Duration::from_secs(8),
        }
    }
}

impl BotConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for anything unset. An unset token is valid (CLI mode); a present
    /// but malformed duration is not.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bot_token: std::env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty())
                .map(SecretString::from),
            session_ttl: duration_secs(
                "ESTATE_INTAKE_SESSION_TTL_SECS",
                std::env::var("ESTATE_INTAKE_SESSION_TTL_SECS").ok().as_deref(),
                defaults.session_ttl,
            )?,
            sweep_interval: duration_secs(
                "ESTATE_INTAKE_SWEEP_SECS",
                std::env::var("ESTATE_INTAKE_SWEEP_SECS").ok().as_deref(),
                defaults.sweep_interval,
            )?,
            lookup_timeout: duration_secs(
                "ESTATE_INTAKE_LOOKUP_TIMEOUT_SECS",
                std::env::var("ESTATE_INTAKE_LOOKUP_TIMEOUT_SECS").ok().as_deref(),
                defaults.lookup_timeout,
            )?,
        })
    }
}

/// Parse a raw env value as whole seconds, defaulting when unset.
fn duration_secs(
    key: &str,
    raw: Option<&str>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected whole seconds, got {value:?}"),
            }),
    }
}
