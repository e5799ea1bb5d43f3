//! Configuration for the chat widget gateway.
//!
//! Everything is read once from the process environment at startup. A `.env`
//! file in the working directory is loaded first via dotenvy, which never
//! overwrites variables that are already set.

mod admin;
pub(crate) mod helpers;
mod http;
mod provider;

use crate::error::ConfigError;

pub use self::admin::{AdminConfig, DEFAULT_ADMIN_PASSWORD_HASH};
pub use self::http::{AllowedOrigins, DEFAULT_HOST, DEFAULT_PORT, HttpConfig};
pub use self::provider::{DEFAULT_OPENAI_BASE_URL, ProviderConfig};

/// Main configuration for the gateway process.
#[derive(Debug, Clone)]
pub struct Config {
    pub http: HttpConfig,
    pub provider: ProviderConfig,
    pub admin: AdminConfig,
}

impl Config {
    /// Load `.env` (if present) and resolve configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::resolve()
    }

    /// Resolve configuration from the current environment only.
    pub fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            http: HttpConfig::resolve()?,
            provider: ProviderConfig::resolve()?,
            admin: AdminConfig::resolve()?,
        })
    }
}
