//! Runtime widget settings, editable from the admin console.
//!
//! Lives for the process lifetime only. The store is owned by the server
//! state and shared by `Arc`; chat and widget handlers read it, admin
//! handlers merge partial updates into it.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::ProviderConfig;

/// Placeholder shown instead of the stored credential. Writing it back
/// leaves the stored credential unchanged.
pub const REDACTION_SENTINEL: &str = "***HIDDEN***";

pub const DEFAULT_WELCOME_MESSAGE: &str = "Hello! How can I help you today?";

/// Presentation settings for the embedded widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetAppearance {
    pub primary_color: String,
    /// `bottom-right` or `bottom-left`; other values render bottom-right.
    pub position: String,
    pub title: String,
}

impl Default for WidgetAppearance {
    fn default() -> Self {
        Self {
            primary_color: "#3B82F6".to_string(),
            position: "bottom-right".to_string(),
            title: "Chat Support".to_string(),
        }
    }
}

/// Partial appearance update; only provided fields overwrite.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetAppearanceUpdate {
    pub primary_color: Option<String>,
    pub position: Option<String>,
    pub title: Option<String>,
}

/// The full settings record.
#[derive(Debug, Clone)]
pub struct WidgetSettings {
    pub api_key: Option<SecretString>,
    pub assistant_id: String,
    pub welcome_message: String,
    pub widget: WidgetAppearance,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            assistant_id: String::new(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            widget: WidgetAppearance::default(),
        }
    }
}

impl WidgetSettings {
    /// Seed settings from the provider section of the startup config.
    pub fn from_provider_config(provider: &ProviderConfig) -> Self {
        Self {
            api_key: provider.api_key.clone(),
            assistant_id: provider.assistant_id.clone().unwrap_or_default(),
            ..Self::default()
        }
    }

    fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }
}

/// Admin view of the settings with the credential redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactedSettings {
    /// The redaction sentinel when a credential is set, empty otherwise.
    pub api_key: String,
    pub assistant_id: String,
    pub welcome_message: String,
    pub widget_config: WidgetAppearance,
    pub has_api_key: bool,
}

/// Settings that any page embedding the widget may read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettings {
    pub welcome_message: String,
    pub widget_config: WidgetAppearance,
}

/// Partial update submitted by an admin.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub api_key: Option<String>,
    pub assistant_id: Option<String>,
    pub welcome_message: Option<String>,
    pub widget_config: Option<WidgetAppearanceUpdate>,
}

/// Provider credentials needed to answer a chat message.
#[derive(Debug, Clone)]
pub struct AssistantCredentials {
    pub api_key: SecretString,
    pub assistant_id: String,
}

/// Process-wide settings store.
#[derive(Debug, Default)]
pub struct SettingsStore {
    inner: RwLock<WidgetSettings>,
}

impl SettingsStore {
    pub fn new(settings: WidgetSettings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    /// Snapshot for the admin console, credential redacted.
    pub async fn get(&self) -> RedactedSettings {
        let settings = self.inner.read().await;
        let has_api_key = settings.has_api_key();
        RedactedSettings {
            api_key: if has_api_key {
                REDACTION_SENTINEL.to_string()
            } else {
                String::new()
            },
            assistant_id: settings.assistant_id.clone(),
            welcome_message: settings.welcome_message.clone(),
            widget_config: settings.widget.clone(),
            has_api_key,
        }
    }

    pub async fn get_public(&self) -> PublicSettings {
        let settings = self.inner.read().await;
        PublicSettings {
            welcome_message: settings.welcome_message.clone(),
            widget_config: settings.widget.clone(),
        }
    }

    /// Shallow-merge an update into the stored settings.
    ///
    /// Empty strings count as "not provided" for the credential, assistant id
    /// and welcome message. Appearance fields are taken as given.
    pub async fn set(&self, update: SettingsUpdate) {
        let mut settings = self.inner.write().await;

        if let Some(api_key) = update.api_key
            && !api_key.is_empty()
            && api_key != REDACTION_SENTINEL
        {
            settings.api_key = Some(SecretString::from(api_key));
        }
        if let Some(assistant_id) = update.assistant_id
            && !assistant_id.is_empty()
        {
            settings.assistant_id = assistant_id;
        }
        if let Some(welcome) = update.welcome_message
            && !welcome.is_empty()
        {
            settings.welcome_message = welcome;
        }
        if let Some(widget) = update.widget_config {
            if let Some(color) = widget.primary_color {
                settings.widget.primary_color = color;
            }
            if let Some(position) = widget.position {
                settings.widget.position = position;
            }
            if let Some(title) = widget.title {
                settings.widget.title = title;
            }
        }
    }

    /// Credentials for the chat path, or `None` if either part is missing.
    pub async fn credentials(&self) -> Option<AssistantCredentials> {
        let settings = self.inner.read().await;
        let api_key = settings.api_key.as_ref()?;
        if api_key.expose_secret().is_empty() || settings.assistant_id.is_empty() {
            return None;
        }
        Some(AssistantCredentials {
            api_key: api_key.clone(),
            assistant_id: settings.assistant_id.clone(),
        })
    }
}
