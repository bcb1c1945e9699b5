use super::{http_client, BackendId, LLMError, LLMProvider, Message, MessageRole, Result};
use crate::config::OnlineProviderConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Google Gemini `generateContent` backend
pub struct GoogleProvider {
    config: OnlineProviderConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: OnlineProviderConfig, api_key: SecretString) -> Result<Self> {
        let client = http_client(BackendId::Google, config.timeout())?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn build_payload(&self, messages: &[Message]) -> Value {
        let mut contents = Vec::new();
        let mut system_parts = Vec::new();

        for msg in messages {
            if msg.role == MessageRole::System {
                system_parts.push(json!({"text": msg.content}));
                continue;
            }

            contents.push(json!({
                "role": if msg.role == MessageRole::Assistant { "model" } else { "user" },
                "parts": [{"text": msg.content}]
            }));
        }

        let mut payload = serde_json::Map::new();
        payload.insert("contents".to_string(), json!(contents));
        payload.insert(
            "generationConfig".to_string(),
            json!({
                "maxOutputTokens": self.config.max_tokens,
                "temperature": self.config.temperature,
            }),
        );

        if !system_parts.is_empty() {
            payload.insert(
                "systemInstruction".to_string(),
                json!({ "parts": system_parts }),
            );
        }

        Value::Object(payload)
    }
}

#[async_trait]
impl LLMProvider for GoogleProvider {
    fn id(&self) -> BackendId {
        BackendId::Google
    }

    async fn check_health(&self) -> bool {
        !self.api_key.unsecure().is_empty()
    }

    async fn chat_completion(&self, messages: &[Message]) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.unsecure())
            .json(&self.build_payload(messages))
            .send()
            .await
            .map_err(|e| LLMError::from_reqwest(BackendId::Google, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(BackendId::Google, status, &text));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::malformed(BackendId::Google, e.to_string()))?;

        let parts = data
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| LLMError::malformed(BackendId::Google, "No candidate content in response"))?;

        let full_text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
            .collect();

        Ok(full_text.trim().to_string())
    }
}
