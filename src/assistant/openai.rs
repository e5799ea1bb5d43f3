//! HTTP client for the OpenAI Assistants API (v2).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::assistant::{
    AssistantProvider, ProviderConnector, Run, Thread, ThreadMessage, redact_sensitive_detail,
};
use crate::error::ProviderError;

const ASSISTANTS_BETA_HEADER: &str = "OpenAI-Beta";
const ASSISTANTS_BETA_VALUE: &str = "assistants=v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Error bodies longer than this are cut before they reach logs.
const MAX_ERROR_BODY: usize = 2048;

/// Shares one pooled HTTP client across per-request providers.
#[derive(Debug, Clone)]
pub struct OpenAiConnector {
    client: Client,
    base_url: Url,
}

impl OpenAiConnector {
    pub fn new(base_url: Url) -> Result<Self, ProviderError> {
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base_url })
    }
}

impl ProviderConnector for OpenAiConnector {
    fn connect(&self, api_key: &SecretString) -> Arc<dyn AssistantProvider> {
        Arc::new(OpenAiAssistants {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: api_key.clone(),
        })
    }
}

/// Assistants API client bound to one credential.
pub struct OpenAiAssistants {
    client: Client,
    base_url: Url,
    api_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<ThreadMessage>,
}

impl OpenAiAssistants {
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(self.api_key.expose_secret())
            .header(ASSISTANTS_BETA_HEADER, ASSISTANTS_BETA_VALUE)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let mut body = redact_sensitive_detail(&body);
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AssistantProvider for OpenAiAssistants {
    async fn create_thread(&self) -> Result<Thread, ProviderError> {
        let url = self.endpoint(&["threads"]);
        self.send(self.request(Method::POST, url).json(&serde_json::json!({})))
            .await
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, ProviderError> {
        let url = self.endpoint(&["threads", thread_id]);
        self.send(self.request(Method::GET, url)).await
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<(), ProviderError> {
        let url = self.endpoint(&["threads", thread_id, "messages"]);
        let _: ThreadMessage = self
            .send(self.request(Method::POST, url).json(&serde_json::json!({
                "role": "user",
                "content": content,
            })))
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ProviderError> {
        let url = self.endpoint(&["threads", thread_id, "runs"]);
        self.send(self.request(Method::POST, url).json(&serde_json::json!({
            "assistant_id": assistant_id,
        })))
        .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError> {
        let url = self.endpoint(&["threads", thread_id, "runs", run_id]);
        self.send(self.request(Method::GET, url)).await
    }

    async fn latest_message(
        &self,
        thread_id: &str,
    ) -> Result<Option<ThreadMessage>, ProviderError> {
        let mut url = self.endpoint(&["threads", thread_id, "messages"]);
        url.query_pairs_mut()
            .append_pair("limit", "1")
            .append_pair("order", "desc");
        let list: MessageList = self.send(self.request(Method::GET, url)).await?;
        Ok(list.data.into_iter().next())
    }
}
