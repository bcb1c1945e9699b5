//! Chat backend abstraction layer
//!
//! This module provides a common interface for the chat-completion backends
//! Valebot can talk to: a local OpenAI-compatible server (LM Studio), OpenAI,
//! Anthropic and Google. The [`LLMProvider`] trait is the contract every
//! backend implements, so the [`orchestrator::ModelOrchestrator`] can look a
//! backend up by [`BackendId`] and treat them all the same way.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod anthropic;
pub mod gemini;
pub mod local;
pub mod openai;
pub mod orchestrator;
pub mod prompts;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Closed set of chat backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// Local OpenAI-compatible server
    Local,
    OpenAI,
    Anthropic,
    Google,
}

impl BackendId {
    pub const ALL: [BackendId; 4] = [
        BackendId::Local,
        BackendId::OpenAI,
        BackendId::Anthropic,
        BackendId::Google,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::Local => "local",
            BackendId::OpenAI => "openai",
            BackendId::Anthropic => "anthropic",
            BackendId::Google => "google",
        }
    }

    /// Environment variable holding this backend's API key
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            BackendId::Local => None,
            BackendId::OpenAI => Some("OPENAI_API_KEY"),
            BackendId::Anthropic => Some("ANTHROPIC_API_KEY"),
            BackendId::Google => Some("GOOGLE_API_KEY"),
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        BackendId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| LLMError::UnknownModelIdentity(s.to_string()))
    }
}

/// Errors that can occur while talking to a backend
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// No client was constructed for this backend
    #[error("Backend '{0}' is not available")]
    BackendUnavailable(BackendId),

    #[error("Request to '{backend}' failed: {reason}")]
    RequestFailed { backend: BackendId, reason: String },

    #[error("Authentication with '{0}' failed")]
    AuthenticationFailed(BackendId),

    #[error("Rate limit exceeded on '{0}'")]
    RateLimitExceeded(BackendId),

    #[error("Request to '{0}' timed out")]
    Timeout(BackendId),

    #[error("Malformed response from '{backend}': {reason}")]
    MalformedResponse { backend: BackendId, reason: String },

    /// The fallback attempt failed too, or there was nowhere to fall back to
    #[error("All backends exhausted: {last_error}")]
    AllBackendsExhausted { last_error: Box<LLMError> },

    #[error("Unknown model identity '{0}'")]
    UnknownModelIdentity(String),
}

impl LLMError {
    /// Map a transport error from reqwest
    pub(crate) fn from_reqwest(backend: BackendId, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LLMError::Timeout(backend)
        } else {
            LLMError::RequestFailed {
                backend,
                reason: crate::secrets::scrub(&e.to_string()),
            }
        }
    }

    /// Map a non-2xx HTTP status
    pub(crate) fn from_status(backend: BackendId, status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => LLMError::AuthenticationFailed(backend),
            429 => LLMError::RateLimitExceeded(backend),
            _ => LLMError::RequestFailed {
                backend,
                reason: format!("HTTP {}: {}", status, crate::secrets::scrub(body.trim())),
            },
        }
    }

    pub(crate) fn malformed(backend: BackendId, reason: impl Into<String>) -> Self {
        LLMError::MalformedResponse {
            backend,
            reason: reason.into(),
        }
    }
}

impl From<LLMError> for sdk::errors::EngineError {
    fn from(e: LLMError) -> Self {
        use sdk::errors::EngineError;

        match e {
            LLMError::AllBackendsExhausted { .. } => EngineError::AllBackendsExhausted,
            LLMError::UnknownModelIdentity(id) => EngineError::UnknownModelIdentity(id),
            other => EngineError::Backend(other.to_string()),
        }
    }
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat backend capability
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Which backend this is
    fn id(&self) -> BackendId;

    /// True for the local server, false for online providers
    fn is_local(&self) -> bool {
        self.id() == BackendId::Local
    }

    /// Send the ordered message list and return the reply text
    async fn chat_completion(&self, messages: &[Message]) -> Result<String>;

    /// Check whether the backend is reachable. Never errors.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Build a reqwest client with the given request timeout
pub(crate) fn http_client(backend: BackendId, timeout: std::time::Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LLMError::RequestFailed {
            backend,
            reason: format!("Failed to build HTTP client: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "Hello");

        assert_eq!(Message::assistant("Hi").role, MessageRole::Assistant);
        assert_eq!(Message::system("Be brief").role, MessageRole::System);
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_string(&Message::user("test")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"test"}"#);
    }

    #[test]
    fn test_backend_id_parsing() {
        assert_eq!("local".parse::<BackendId>().unwrap(), BackendId::Local);
        assert_eq!("OpenAI".parse::<BackendId>().unwrap(), BackendId::OpenAI);
        assert_eq!(" google ".parse::<BackendId>().unwrap(), BackendId::Google);

        let err = "gpt5".parse::<BackendId>().unwrap_err();
        assert!(matches!(err, LLMError::UnknownModelIdentity(ref s) if s == "gpt5"));
    }

    #[test]
    fn test_backend_id_serde_matches_display() {
        for id in BackendId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id));
        }
    }

    #[test]
    fn test_status_mapping() {
        use reqwest::StatusCode;

        assert!(matches!(
            LLMError::from_status(BackendId::OpenAI, StatusCode::UNAUTHORIZED, ""),
            LLMError::AuthenticationFailed(BackendId::OpenAI)
        ));
        assert!(matches!(
            LLMError::from_status(BackendId::Google, StatusCode::FORBIDDEN, ""),
            LLMError::AuthenticationFailed(BackendId::Google)
        ));
        assert!(matches!(
            LLMError::from_status(BackendId::Anthropic, StatusCode::TOO_MANY_REQUESTS, ""),
            LLMError::RateLimitExceeded(BackendId::Anthropic)
        ));
        assert!(matches!(
            LLMError::from_status(BackendId::Local, StatusCode::BAD_GATEWAY, "down"),
            LLMError::RequestFailed { backend: BackendId::Local, .. }
        ));
    }

    #[test]
    fn test_engine_error_conversion() {
        use sdk::errors::EngineError;

        let exhausted = LLMError::AllBackendsExhausted {
            last_error: Box::new(LLMError::Timeout(BackendId::OpenAI)),
        };
        assert!(matches!(
            EngineError::from(exhausted),
            EngineError::AllBackendsExhausted
        ));
    }
}
