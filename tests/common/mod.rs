//! Shared fixtures for integration tests: a scripted in-memory assistant
//! provider and a fully wired gateway state.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use chatwidget_gateway::assistant::{
    AssistantGateway, AssistantProvider, MAX_POLL_ATTEMPTS, MessageContent, PollPolicy,
    ProviderConnector, Run, RunError, RunStatus, TextContent, Thread, ThreadMessage,
};
use chatwidget_gateway::config::DEFAULT_ADMIN_PASSWORD_HASH;
use chatwidget_gateway::error::ProviderError;
use chatwidget_gateway::settings::{SettingsStore, WidgetSettings};
use chatwidget_gateway::web::{AdminAuth, GatewayState};

pub const TOKEN_SECRET: &str = "integration-test-secret";
/// Plain-text password matching `DEFAULT_ADMIN_PASSWORD_HASH`.
pub const ADMIN_PASSWORD: &str = "password";

/// Provider whose runs report `final_status` after `polls_until_final`
/// status checks and `in_progress` before that.
pub struct ScriptedAssistant {
    known_threads: Mutex<HashSet<String>>,
    polls_until_final: u32,
    final_status: RunStatus,
    reply: String,
    pub threads_created: AtomicU32,
    pub retrievals: AtomicU32,
    pub posted: Mutex<Vec<(String, String)>>,
}

impl ScriptedAssistant {
    pub fn new(polls_until_final: u32, final_status: RunStatus) -> Self {
        Self {
            known_threads: Mutex::new(HashSet::new()),
            polls_until_final,
            final_status,
            reply: "hello".to_string(),
            threads_created: AtomicU32::new(0),
            retrievals: AtomicU32::new(0),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn completing() -> Self {
        Self::new(1, RunStatus::Completed)
    }

    pub fn with_thread(self, id: &str) -> Self {
        self.known_threads.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = reply.to_string();
        self
    }
}

#[async_trait]
impl AssistantProvider for ScriptedAssistant {
    async fn create_thread(&self) -> Result<Thread, ProviderError> {
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("thread_new_{n}");
        self.known_threads.lock().unwrap().insert(id.clone());
        Ok(Thread { id })
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, ProviderError> {
        if self.known_threads.lock().unwrap().contains(thread_id) {
            Ok(Thread {
                id: thread_id.to_string(),
            })
        } else {
            Err(ProviderError::Status {
                status: 404,
                body: format!("No thread found with id '{thread_id}'."),
            })
        }
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<(), ProviderError> {
        self.posted
            .lock()
            .unwrap()
            .push((thread_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<Run, ProviderError> {
        Ok(Run {
            id: "run_1".to_string(),
            status: RunStatus::Queued,
            last_error: None,
        })
    }

    async fn retrieve_run(&self, _thread_id: &str, run_id: &str) -> Result<Run, ProviderError> {
        let n = self.retrievals.fetch_add(1, Ordering::SeqCst) + 1;
        let status = if n >= self.polls_until_final {
            self.final_status.clone()
        } else {
            RunStatus::InProgress
        };
        let last_error = (status == RunStatus::Failed).then(|| RunError {
            code: "server_error".to_string(),
            message: "upstream detail sk-should-never-leak-1234567890".to_string(),
        });
        Ok(Run {
            id: run_id.to_string(),
            status,
            last_error,
        })
    }

    async fn latest_message(&self, _thread_id: &str) -> Result<Option<ThreadMessage>, ProviderError> {
        Ok(Some(ThreadMessage {
            id: "msg_1".to_string(),
            role: "assistant".to_string(),
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: self.reply.clone(),
                },
            }],
        }))
    }
}

/// Hands out the same scripted provider and records the keys it was bound to.
pub struct StubConnector {
    pub provider: Arc<ScriptedAssistant>,
    pub connects: AtomicU32,
    pub keys: Mutex<Vec<String>>,
}

impl StubConnector {
    pub fn last_key(&self) -> Option<String> {
        self.keys.lock().unwrap().last().cloned()
    }
}

impl ProviderConnector for StubConnector {
    fn connect(&self, api_key: &SecretString) -> Arc<dyn AssistantProvider> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.keys
            .lock()
            .unwrap()
            .push(api_key.expose_secret().to_string());
        self.provider.clone()
    }
}

pub fn configured_settings() -> WidgetSettings {
    WidgetSettings {
        api_key: Some(SecretString::from("sk-test")),
        assistant_id: "asst_1".to_string(),
        ..WidgetSettings::default()
    }
}

/// Gateway state backed by `provider`, polling every millisecond.
pub fn test_state(
    settings: WidgetSettings,
    provider: ScriptedAssistant,
) -> (Arc<GatewayState>, Arc<StubConnector>) {
    let connector = Arc::new(StubConnector {
        provider: Arc::new(provider),
        connects: AtomicU32::new(0),
        keys: Mutex::new(Vec::new()),
    });
    let settings = Arc::new(SettingsStore::new(settings));
    let gateway = AssistantGateway::new(settings.clone(), connector.clone()).with_poll_policy(
        PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts: MAX_POLL_ATTEMPTS,
        },
    );
    let auth = AdminAuth::new(
        DEFAULT_ADMIN_PASSWORD_HASH,
        SecretString::from(TOKEN_SECRET),
    );

    let state = Arc::new(GatewayState {
        settings,
        gateway: Arc::new(gateway),
        auth: Arc::new(auth),
    });
    (state, connector)
}
