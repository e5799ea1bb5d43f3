use std::sync::Arc;

use crate::assistant::{
    AssistantProvider, PollOutcome, PollPolicy, ProviderConnector, RunPoller, Thread,
    redact_sensitive_detail,
};
use crate::error::GatewayError;
use crate::settings::SettingsStore;

/// Reply text plus the conversation handle the caller should send next time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    pub thread_id: String,
}

/// Synchronous facade over the provider's submit-and-poll run model.
pub struct AssistantGateway {
    settings: Arc<SettingsStore>,
    connector: Arc<dyn ProviderConnector>,
    policy: PollPolicy,
}

impl AssistantGateway {
    pub fn new(settings: Arc<SettingsStore>, connector: Arc<dyn ProviderConnector>) -> Self {
        Self {
            settings,
            connector,
            policy: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Post `message` to the conversation and wait for the assistant's answer.
    ///
    /// Fails with [`GatewayError::NotConfigured`] before touching the provider
    /// when the credential or assistant id is missing.
    pub async fn get_reply(
        &self,
        message: &str,
        thread_id: Option<&str>,
    ) -> Result<AssistantReply, GatewayError> {
        let credentials = self
            .settings
            .credentials()
            .await
            .ok_or(GatewayError::NotConfigured)?;
        if message.trim().is_empty() {
            return Err(GatewayError::EmptyMessage);
        }

        let provider = self.connector.connect(&credentials.api_key);
        let thread = resolve_thread(provider.as_ref(), thread_id).await?;

        provider.create_message(&thread.id, message).await?;
        let run = provider
            .create_run(&thread.id, &credentials.assistant_id)
            .await?;
        let run_id = run.id.clone();

        let outcome = RunPoller::new(provider.as_ref(), &thread.id, self.policy)
            .wait(run)
            .await?;

        match outcome {
            PollOutcome::Completed { attempts } => {
                tracing::debug!(thread_id = %thread.id, run_id = %run_id, attempts, "Assistant run completed");
                let text = provider
                    .latest_message(&thread.id)
                    .await?
                    .and_then(|m| m.text().map(str::to_string))
                    .ok_or(GatewayError::EmptyReply)?;
                Ok(AssistantReply {
                    text,
                    thread_id: thread.id,
                })
            }
            PollOutcome::Failed { error, attempts } => {
                let detail = error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no error detail".to_string());
                tracing::error!(
                    thread_id = %thread.id,
                    run_id = %run_id,
                    attempts,
                    detail = %redact_sensitive_detail(&detail),
                    "Assistant run failed"
                );
                Err(GatewayError::RunFailed { detail })
            }
            PollOutcome::TimedOut { attempts } => {
                tracing::error!(
                    thread_id = %thread.id,
                    run_id = %run_id,
                    attempts,
                    "Assistant run timed out"
                );
                Err(GatewayError::RunTimeout {
                    attempts,
                    waited: self.policy.interval * attempts,
                })
            }
            PollOutcome::Ended { status, attempts } => {
                tracing::error!(
                    thread_id = %thread.id,
                    run_id = %run_id,
                    attempts,
                    status = %status,
                    "Assistant run ended without a reply"
                );
                Err(GatewayError::RunEnded {
                    status: status.to_string(),
                })
            }
        }
    }
}

/// Reuse the caller's conversation, or start a new one.
///
/// Any retrieval failure falls back to a fresh conversation. This also hides
/// transient network errors, which then surface as a lost conversation rather
/// than a failed request.
async fn resolve_thread(
    provider: &dyn AssistantProvider,
    thread_id: Option<&str>,
) -> Result<Thread, GatewayError> {
    if let Some(thread_id) = thread_id.filter(|id| !id.is_empty()) {
        match provider.retrieve_thread(thread_id).await {
            Ok(thread) => return Ok(thread),
            Err(e) => {
                tracing::warn!(
                    thread_id,
                    not_found = e.is_not_found(),
                    error = %redact_sensitive_detail(&e.to_string()),
                    "Conversation lookup failed, starting a new one"
                );
            }
        }
    }
    Ok(provider.create_thread().await?)
}
