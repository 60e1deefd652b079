//! Server configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_COOKIE_NAME: &str = "nextauth.token";
pub const DEFAULT_SESSION_MAX_AGE_DAYS: i64 = 30;
pub const DEFAULT_API_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_API_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    pub request: Duration,
    pub connect: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the REST backend, without a trailing slash.
    pub api_url: String,
    pub port: u16,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub session_max_age_days: i64,
    pub timeouts: ApiTimeouts,
}

impl Config {
    /// Build typed config from the process environment.
    ///
    /// Required:
    /// - `BACKOFFICE_API_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `SESSION_COOKIE_NAME`: default `nextauth.token`
    /// - `SESSION_MAX_AGE_DAYS`: default 30
    /// - `COOKIE_SECURE`: inferred from an `https://` API URL when unset
    /// - `API_REQUEST_TIMEOUT_SECS`: default 30
    /// - `API_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is missing or a numeric value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is missing or a numeric value fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("BACKOFFICE_API_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("BACKOFFICE_API_URL"))?
            .trim()
            .trim_end_matches('/')
            .to_string();

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let cookie_name = lookup("SESSION_COOKIE_NAME")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());
        let cookie_secure = lookup("COOKIE_SECURE")
            .as_deref()
            .and_then(parse_bool)
            .unwrap_or_else(|| api_url.starts_with("https://"));
        let session_max_age_days = parse_or(&lookup, "SESSION_MAX_AGE_DAYS", DEFAULT_SESSION_MAX_AGE_DAYS)?;
        if session_max_age_days <= 0 {
            return Err(ConfigError::Invalid { var: "SESSION_MAX_AGE_DAYS", value: session_max_age_days.to_string() });
        }
        let timeouts = ApiTimeouts {
            request: Duration::from_secs(parse_or(
                &lookup,
                "API_REQUEST_TIMEOUT_SECS",
                DEFAULT_API_REQUEST_TIMEOUT_SECS,
            )?),
            connect: Duration::from_secs(parse_or(
                &lookup,
                "API_CONNECT_TIMEOUT_SECS",
                DEFAULT_API_CONNECT_TIMEOUT_SECS,
            )?),
        };

        Ok(Self { api_url, port, cookie_name, cookie_secure, session_max_age_days, timeouts })
    }
}

impl Default for ApiTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(DEFAULT_API_REQUEST_TIMEOUT_SECS),
            connect: Duration::from_secs(DEFAULT_API_CONNECT_TIMEOUT_SECS),
        }
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
