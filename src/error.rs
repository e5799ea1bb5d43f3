//! Error types for the chat widget gateway.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// HTTP server lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server failed to start: {reason}")]
    StartupFailed { reason: String },

    #[error("Server stopped unexpectedly: {0}")]
    Serve(#[from] std::io::Error),
}

/// Errors raised while talking to the hosted assistant API.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from provider: {0}")]
    Decode(String),

    #[error("Invalid provider base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ProviderError {
    /// Whether the provider said the addressed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Failures of a single `get_reply` exchange.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Assistant credential or assistant id is not configured")]
    NotConfigured,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Assistant run failed: {detail}")]
    RunFailed { detail: String },

    #[error("Assistant run still pending after {attempts} polls ({waited:?})")]
    RunTimeout { attempts: u32, waited: Duration },

    #[error("Assistant run ended with status {status}")]
    RunEnded { status: String },

    #[error("Newest conversation message has no text content")]
    EmptyReply,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl GatewayError {
    /// Message safe to show to an end user. Provider detail never appears here.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::NotConfigured => "Chatbot not configured. Please contact the administrator.",
            Self::EmptyMessage => "Message is required",
            Self::RunFailed { .. } => "Assistant failed to process the message",
            Self::RunTimeout { .. } | Self::RunEnded { .. } => {
                "Request timed out. Please try again."
            }
            Self::EmptyReply | Self::Provider(_) => "Failed to process chat message",
        }
    }

    /// Whether the caller, not the upstream, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::EmptyMessage)
    }
}

/// Admin authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(&'static str),

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token signing error: {0}")]
    Signing(String),

    #[error("Password check task failed: {0}")]
    TaskFailed(String),
}
