//! Valebot SDK
//!
//! Shared library providing the engine error type and the wire types spoken
//! by the engine's HTTP/WebSocket surface. Used by the engine and by clients.

/// Error types and handling
pub mod errors;

/// Request/response wire types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, ValebotErrorExt};
pub use types::{
    ChatRequest, ChatResponse, CommandRequest, FollowStateResponse, ModelSwitchRequest,
    ModelsResponse, ParsedCommandResponse, PositionSnapshot, PositionUpdate,
    RobotStatusResponse, StatusMessage, WsEvent, WsIncoming,
};
