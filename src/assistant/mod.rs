//! Hosted assistant integration.
//!
//! The provider exposes an asynchronous job model: a message is posted into a
//! thread, a run is created, and the run must be polled until it finishes.
//! [`AssistantGateway`] turns that into one awaited call per chat request.

mod gateway;
pub mod openai;
mod poller;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ProviderError;

pub use self::gateway::{AssistantGateway, AssistantReply};
pub use self::openai::{OpenAiAssistants, OpenAiConnector};
pub use self::poller::{MAX_POLL_ATTEMPTS, POLL_INTERVAL, PollOutcome, PollPolicy, RunPoller};

/// A provider-side conversation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// Lifecycle status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Other(s) => s,
        }
    }

    /// Still worth polling.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::InProgress)
    }
}

impl From<String> for RunStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "cancelling" => Self::Cancelling,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            "completed" => Self::Completed,
            "incomplete" => Self::Incomplete,
            "expired" => Self::Expired,
            _ => Self::Other(value),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload attached to a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code.is_empty(), self.message.is_empty()) {
            (false, false) => write!(f, "{}: {}", self.code, self.message),
            (false, true) => f.write_str(&self.code),
            (true, false) => f.write_str(&self.message),
            (true, true) => f.write_str("no error detail"),
        }
    }
}

/// One asynchronous unit of assistant work.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextContent {
    pub value: String,
}

/// A content part of a thread message. Only text parts are used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

/// A message stored in a provider thread.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// The first text part, if any.
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Other => None,
        })
    }
}

/// Operations the gateway needs from a hosted assistant API.
#[async_trait]
pub trait AssistantProvider: Send + Sync {
    async fn create_thread(&self) -> Result<Thread, ProviderError>;

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, ProviderError>;

    /// Append a user message to the thread.
    async fn create_message(&self, thread_id: &str, content: &str) -> Result<(), ProviderError>;

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ProviderError>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError>;

    /// The newest message of the thread.
    async fn latest_message(&self, thread_id: &str)
    -> Result<Option<ThreadMessage>, ProviderError>;
}

/// Binds a provider client to a credential.
///
/// The credential can be changed by an admin while the process runs, so a
/// provider is bound per chat request.
pub trait ProviderConnector: Send + Sync {
    fn connect(&self, api_key: &SecretString) -> Arc<dyn AssistantProvider>;
}

/// Scrub bearer tokens and API keys from text destined for logs.
pub(crate) fn redact_sensitive_detail(raw: &str) -> String {
    let mut value = raw.to_string();
    let patterns = [
        (r"(?i)\b(bearer)\s+[a-z0-9._\-~+/]+=*", "$1 [REDACTED]"),
        (
            r"(?i)\b(token|api[_\-]?key|secret|password)\b(\s*[:=]\s*)([^,\s]+)",
            "$1$2[REDACTED]",
        ),
        (r"(?i)\bsk-[a-z0-9_\-]{10,}", "sk-[REDACTED]"),
    ];

    for (pattern, replacement) in patterns {
        if let Ok(re) = Regex::new(pattern) {
            value = re.replace_all(&value, replacement).to_string();
        }
    }

    value
}
