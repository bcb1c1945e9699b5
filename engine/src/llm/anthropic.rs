use super::{http_client, BackendId, LLMError, LLMProvider, Message, MessageRole, Result};
use crate::config::OnlineProviderConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    config: OnlineProviderConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: OnlineProviderConfig, api_key: SecretString) -> Result<Self> {
        let client = http_client(BackendId::Anthropic, config.timeout())?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn build_payload(&self, messages: &[Message]) -> Value {
        let mut system_prompt = String::new();
        let mut api_messages = Vec::new();
        for msg in messages {
            if msg.role == MessageRole::System {
                if !system_prompt.is_empty() {
                    system_prompt.push('\n');
                }
                system_prompt.push_str(&msg.content);
                continue;
            }
            api_messages.push(json!({
                "role": if msg.role == MessageRole::Assistant { "assistant" } else { "user" },
                "content": msg.content
            }));
        }

        json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": system_prompt,
            "messages": api_messages,
        })
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn id(&self) -> BackendId {
        BackendId::Anthropic
    }

    async fn check_health(&self) -> bool {
        !self.api_key.unsecure().is_empty()
    }

    async fn chat_completion(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.unsecure())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_payload(messages))
            .send()
            .await
            .map_err(|e| LLMError::from_reqwest(BackendId::Anthropic, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(BackendId::Anthropic, status, &text));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::malformed(BackendId::Anthropic, e.to_string()))?;

        let content_arr = data
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LLMError::malformed(BackendId::Anthropic, "No content array in response"))?;

        let full_content: String = content_arr
            .iter()
            .filter_map(|item| item.get("text").and_then(|t| t.as_str()))
            .collect();

        Ok(full_content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OnlineProviderConfig;

    #[test]
    fn test_system_messages_move_to_top_level() {
        let provider =
            AnthropicProvider::new(OnlineProviderConfig::anthropic(), SecretString::new("k"))
                .unwrap();

        let payload = provider.build_payload(&[
            Message::system("You are a robot assistant."),
            Message::user("hi"),
            Message::assistant("hello"),
        ]);

        assert_eq!(payload["system"], "You are a robot assistant.");
        let msgs = payload["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["role"], "user");
        assert_eq!(msgs[1]["role"], "assistant");
    }
}
