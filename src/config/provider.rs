use secrecy::SecretString;
use url::Url;

use crate::config::helpers::optional_env;
use crate::error::ConfigError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Hosted assistant provider settings read at startup.
///
/// The credential and assistant id only seed the runtime settings store;
/// admins can replace both later through the API.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<SecretString>,
    pub assistant_id: Option<String>,
    pub base_url: Url,
}

impl ProviderConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let raw_base = optional_env("OPENAI_BASE_URL")?
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        let base_url = Url::parse(raw_base.trim_end_matches('/')).map_err(|e| {
            ConfigError::InvalidValue {
                key: "OPENAI_BASE_URL".to_string(),
                message: format!("must be an absolute URL: {e}"),
            }
        })?;

        Ok(Self {
            api_key: optional_env("OPENAI_API_KEY")?.map(SecretString::from),
            assistant_id: optional_env("ASSISTANT_ID")?,
            base_url,
        })
    }
}
