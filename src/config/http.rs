use crate::config::helpers::{optional_env, parse_optional_env};
use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;

/// Which browser origins may call the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// `*`: any origin is mirrored back.
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parse the comma-separated `ALLOWED_ORIGINS` format.
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            Self::Any
        } else {
            Self::List(origins)
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: AllowedOrigins,
}

impl HttpConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            host: optional_env("HOST")?.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_optional_env("PORT", "a valid port number")?.unwrap_or(DEFAULT_PORT),
            allowed_origins: optional_env("ALLOWED_ORIGINS")?
                .map(|s| AllowedOrigins::parse(&s))
                .unwrap_or(AllowedOrigins::Any),
        })
    }

    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
