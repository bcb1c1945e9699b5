//! Wire types shared by the engine's HTTP/WebSocket surface and its clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,

    /// Attach the robot's state, battery and rooms to the prompt
    #[serde(default = "default_true")]
    pub include_context: bool,
}

impl ChatRequest {
    /// Create a chat request that includes robot context
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            include_context: true,
        }
    }
}

/// Reply to `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Assistant reply text
    pub response: String,

    /// Backend that produced the reply (after any fallback)
    pub model_used: String,

    /// Classified intent, if the utterance looked like a robot command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    /// Whether the classified command was executed against the robot
    #[serde(default)]
    pub executed: bool,

    /// Why execution failed or was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_note: Option<String>,
}

/// Body of `POST /ai/switch-model`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSwitchRequest {
    /// One of "local", "openai", "anthropic", "google"
    pub model: String,
}

/// Reply to `GET /ai/models`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub current: String,
    pub available: Vec<String>,
}

/// Body of `POST /command/parse`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

/// Reply to `POST /command/parse`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedCommandResponse {
    /// Detected language code ("pl" or "en")
    pub language: String,

    /// `None` when the text is plain chat
    pub action: Option<String>,

    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub confidence: f64,

    /// Localized acknowledgement for the action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledgement: Option<String>,
}

/// Reply to `GET /robot/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotStatusResponse {
    pub state: String,
    pub battery: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `POST /follow/position`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub x: i64,
    pub y: i64,
}

/// Reply to `GET /follow`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowStateResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_position: Option<PositionSnapshot>,
}

/// A user position as seen by API clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub x: i64,
    pub y: i64,
    pub observed_at: DateTime<Utc>,
}

/// Generic `{"status": ..., "message": ...}` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

impl StatusMessage {
    /// Create a success acknowledgement
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

/// Frame received on the chat WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsIncoming {
    #[serde(default)]
    pub message: String,
}

/// Frame sent on the chat WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    /// Assistant reply
    Message {
        response: String,
        model: String,
        intent: Option<String>,
    },

    /// A classified command was executed
    CommandExecuted { action: String },

    /// Chat or execution failure
    Error { message: String },
}

impl WsEvent {
    /// Serialize the event to JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","message":"Failed to serialize event"}"#.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_defaults_to_context() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": "hello"}"#).unwrap();
        assert_eq!(req.message, "hello");
        assert!(req.include_context);
    }

    #[test]
    fn test_chat_response_omits_empty_fields() {
        let resp = ChatResponse {
            response: "Hi".to_string(),
            model_used: "local".to_string(),
            intent: None,
            executed: false,
            execution_note: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("intent"));
        assert!(!json.contains("execution_note"));
    }

    #[test]
    fn test_ws_event_tagging() {
        let event = WsEvent::CommandExecuted {
            action: "home".to_string(),
        };
        let json = event.to_json();
        assert!(json.contains(r#""type":"command_executed""#));
        assert!(json.contains(r#""action":"home""#));

        let event = WsEvent::Error {
            message: "boom".to_string(),
        };
        assert!(event.to_json().contains(r#""type":"error""#));
    }

    #[test]
    fn test_ws_incoming_missing_message() {
        let frame: WsIncoming = serde_json::from_str("{}").unwrap();
        assert!(frame.message.is_empty());
    }

    #[test]
    fn test_status_message_success() {
        let msg = StatusMessage::success("History cleared");
        assert_eq!(msg.status, "success");
        assert_eq!(msg.message, "History cleared");
    }
}
