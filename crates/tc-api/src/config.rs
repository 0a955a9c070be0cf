//! # Service Configuration
//!
//! Read once at startup from the environment:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `PORT` | 8080 | listen port |
//! | `DATABASE_URL` | unset | Postgres URL; unset runs on in-memory stores |
//! | `TC_LOG_FORMAT` | `text` | `json` for structured log lines |
//!
//! Ledger settings are read separately by `tc_ledger::LedgerConfig`.

use std::fmt;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT '{0}'")]
    InvalidPort(String),
    #[error("invalid TC_LOG_FORMAT '{0}', expected 'text' or 'json'")]
    InvalidLogFormat(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            log_format: LogFormat::Text,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => DEFAULT_PORT,
        };
        let log_format = match lookup("TC_LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(v) => return Err(ConfigError::InvalidLogFormat(v.to_string())),
        };
        Ok(Self {
            port,
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            log_format,
        })
    }
}
