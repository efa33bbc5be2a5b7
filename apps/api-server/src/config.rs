//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 8080)
    pub port: u16,
    /// Interface to bind (default: 0.0.0.0)
    pub bind_addr: IpAddr,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Port
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError {
                field: "PORT",
                message: format!("Invalid port '{}': {}", raw, e),
            })?,
            None => 8080,
        };

        // Bind address
        let bind_addr = match lookup("BIND_ADDR").filter(|s| !s.is_empty()) {
            Some(raw) => raw.trim().parse::<IpAddr>().map_err(|e| ConfigError {
                field: "BIND_ADDR",
                message: format!("Invalid IP address '{}': {}", raw, e),
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        // CORS allow origin
        let cors_origin_str = lookup("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        // Log format
        let log_format = LogFormat::from_str(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        Ok(Self {
            port,
            bind_addr,
            cors_allow_origin,
            log_format,
        })
    }

    /// Log warnings about permissive configuration.
    pub fn warn_if_insecure(&self) {
        if self.cors_allow_origin == HeaderValue::from_static("*") {
            tracing::warn!(
                "CORS_ALLOW_ORIGIN=*: any origin may call the API. \
                 Set CORS_ALLOW_ORIGIN to restrict browser access."
            );
        }
    }
}
