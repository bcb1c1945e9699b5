//! Local chat backend
//!
//! Talks to an OpenAI-compatible server on the LAN, typically LM Studio at
//! `http://<host>:1234/v1`. No API key is needed.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::openai::{chat_completions_payload, extract_choice_content};
use super::{http_client, BackendId, LLMError, LLMProvider, Message, Result};
use crate::config::LocalConfig;

#[derive(Debug, Clone)]
pub struct LocalProvider {
    config: LocalConfig,
    client: Client,
}

impl LocalProvider {
    pub fn new(config: LocalConfig) -> Result<Self> {
        let client = http_client(BackendId::Local, config.timeout())?;
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

#[async_trait]
impl LLMProvider for LocalProvider {
    fn id(&self) -> BackendId {
        BackendId::Local
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/models", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Local backend health probe failed: {}", e);
                false
            }
        }
    }

    async fn chat_completion(&self, messages: &[Message]) -> Result<String> {
        tracing::debug!(
            "Local request: model={}, messages={}, total_chars={}",
            self.config.model,
            messages.len(),
            messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let payload = chat_completions_payload(
            &self.config.model,
            messages,
            self.config.max_tokens,
            self.config.temperature,
        );

        let url = format!("{}/chat/completions", self.config.base_url);
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LLMError::RequestFailed {
                        backend: BackendId::Local,
                        reason: format!(
                            "Cannot connect to local server at {}. Is it running?",
                            self.config.base_url
                        ),
                    }
                } else {
                    LLMError::from_reqwest(BackendId::Local, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(BackendId::Local, status, &text));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::malformed(BackendId::Local, e.to_string()))?;

        tracing::debug!("Local response in {:?}", start.elapsed());
        extract_choice_content(BackendId::Local, &data)
    }
}
