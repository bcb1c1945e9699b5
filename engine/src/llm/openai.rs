use super::{http_client, BackendId, LLMError, LLMProvider, Message, Result};
use crate::config::OnlineProviderConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::{json, Value};

/// OpenAI chat completions backend
pub struct OpenAIProvider {
    config: OnlineProviderConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OnlineProviderConfig, api_key: SecretString) -> Result<Self> {
        let client = http_client(BackendId::OpenAI, config.timeout())?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }
}

/// Request body shared by OpenAI and OpenAI-compatible servers
pub(crate) fn chat_completions_payload(
    model: &str,
    messages: &[Message],
    max_tokens: u32,
    temperature: f32,
) -> Value {
    let api_messages: Vec<Value> = messages
        .iter()
        .map(|msg| {
            json!({
                "role": msg.role.to_string(),
                "content": msg.content
            })
        })
        .collect();

    json!({
        "model": model,
        "messages": api_messages,
        "max_tokens": max_tokens,
        "temperature": temperature,
        "stream": false,
    })
}

/// Pull `choices[0].message.content` out of a chat completions response
pub(crate) fn extract_choice_content(backend: BackendId, data: &Value) -> Result<String> {
    let choice = data
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| LLMError::malformed(backend, "No choices in response"))?;

    choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| LLMError::malformed(backend, "No message content in choice"))
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn id(&self) -> BackendId {
        BackendId::OpenAI
    }

    async fn check_health(&self) -> bool {
        !self.api_key.unsecure().is_empty()
    }

    async fn chat_completion(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let payload = chat_completions_payload(
            &self.config.model,
            messages,
            self.config.max_tokens,
            self.config.temperature,
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.unsecure())
            .json(&payload)
            .send()
            .await
            .map_err(|e| LLMError::from_reqwest(BackendId::OpenAI, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(BackendId::OpenAI, status, &text));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::malformed(BackendId::OpenAI, e.to_string()))?;

        extract_choice_content(BackendId::OpenAI, &data)
    }
}
