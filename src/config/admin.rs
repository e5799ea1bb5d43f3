use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use secrecy::SecretString;

use crate::config::helpers::optional_env;
use crate::error::ConfigError;

/// bcrypt hash of the literal `password`, used when no hash is configured.
pub const DEFAULT_ADMIN_PASSWORD_HASH: &str =
    "$2a$10$92IXUNpkjO0rOQ5byMi.Ye4oKoEa3Ro9llC/.og/at2.uheWG/igi";

/// Admin console authentication settings.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub password_hash: String,
    /// HMAC key for admin bearer tokens.
    pub jwt_secret: SecretString,
    /// True when `ADMIN_PASSWORD_HASH` was unset and the default is in use.
    pub default_password: bool,
    /// True when `JWT_SECRET` was unset and a random key was generated.
    pub ephemeral_secret: bool,
}

impl AdminConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let configured_hash = optional_env("ADMIN_PASSWORD_HASH")?;
        if let Some(hash) = configured_hash.as_deref()
            && !hash.starts_with("$2")
        {
            return Err(ConfigError::InvalidValue {
                key: "ADMIN_PASSWORD_HASH".to_string(),
                message: "must be a bcrypt hash (see `hash-password`)".to_string(),
            });
        }
        let configured_secret = optional_env("JWT_SECRET")?;

        Ok(Self {
            default_password: configured_hash.is_none(),
            ephemeral_secret: configured_secret.is_none(),
            password_hash: configured_hash
                .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD_HASH.to_string()),
            jwt_secret: SecretString::from(
                configured_secret.unwrap_or_else(generate_token_secret),
            ),
        })
    }
}

/// Random 256-bit key, used when no signing secret is configured.
fn generate_token_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
