//! Runtime configuration read from the environment
//!
//! The binaries call `dotenvy::dotenv()` first, so a `.env` file in the
//! working directory is honoured.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::auth::DEFAULT_TOKEN_TTL;
use crate::gateway::{DEFAULT_MODEL, DEFAULT_TIMEOUT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: expected {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub upstream_timeout: Duration,
    pub validate_plans: bool,
    pub require_auth: bool,
    pub token_secret: Option<String>,
    pub token_ttl: Duration,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            upstream_timeout: DEFAULT_TIMEOUT,
            validate_plans: true,
            require_auth: false,
            token_secret: None,
            token_ttl: DEFAULT_TOKEN_TTL,
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set to a value that cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns an error when a value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Self {
            model: get("DEFAULT_MODEL").unwrap_or(defaults.model),
            api_key: get("DEFAULT_KEY"),
            upstream_timeout: parse_secs(get("UPSTREAM_TIMEOUT_SECS"), "UPSTREAM_TIMEOUT_SECS")?
                .unwrap_or(defaults.upstream_timeout),
            validate_plans: parse_bool(get("VALIDATE_PLANS"), "VALIDATE_PLANS")?.unwrap_or(defaults.validate_plans),
            require_auth: parse_bool(get("REQUIRE_AUTH"), "REQUIRE_AUTH")?.unwrap_or(defaults.require_auth),
            token_secret: get("TOKEN_SECRET"),
            token_ttl: parse_secs(get("TOKEN_TTL_SECS"), "TOKEN_TTL_SECS")?.unwrap_or(defaults.token_ttl),
            host: get("HOST").unwrap_or(defaults.host),
            port: parse(get("PORT"), "PORT", "a port number")?.unwrap_or(defaults.port),
        })
    }
}

fn parse<T: FromStr>(
    value: Option<String>,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|value| {
            value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
                name,
                value,
                expected,
            })
        })
        .transpose()
}

fn parse_secs(
    value: Option<String>,
    name: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    match parse::<u64>(value.clone(), name, "a positive number of seconds")? {
        Some(0) => Err(ConfigError::Invalid {
            name,
            value: value.unwrap_or_default(),
            expected: "a positive number of seconds",
        }),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

fn parse_bool(
    value: Option<String>,
    name: &'static str,
) -> Result<Option<bool>, ConfigError> {
    value
        .map(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                value,
                expected: "true or false",
            }),
        })
        .transpose()
}
