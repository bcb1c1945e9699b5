//! Error types and handling
//!
//! This module provides the top-level error type used across the Valebot engine
//! and its transport surfaces. All errors implement the `ValebotErrorExt` trait
//! which provides user-friendly hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry API keys: provider errors are scrubbed by the
//! engine before they are wrapped here.

use thiserror::Error;

/// Trait for Valebot error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information.
pub trait ValebotErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users (chat UI, CLI) and does not
    /// contain secrets or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried by the caller. Non-recoverable
    /// errors require configuration changes or a restart.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Backend**: chat-completion provider failures
/// - **Robot**: Valetudo API failures
/// - **Secrets**: keychain access
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ValebotErrorExt};
///
/// let error = EngineError::UnknownModelIdentity("gpt5".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::AllBackendsExhausted;
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Path canonicalization failed for {0:?}: {1}")]
    PathCanonicalization(std::path::PathBuf, String),

    // Backend errors
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("All backends exhausted")]
    AllBackendsExhausted,

    #[error("Unknown model identity: {0}")]
    UnknownModelIdentity(String),

    // Robot errors
    #[error("Robot error: {0}")]
    Robot(String),

    #[error("Unknown room: {0}")]
    UnknownRoom(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ValebotErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::PathCanonicalization(_, _) => "Invalid path specified",

            Self::Backend(_) => "Chat backend unavailable. Check your API keys and network",
            Self::AllBackendsExhausted => {
                "No chat backend answered. Check the local server and online providers"
            }
            Self::UnknownModelIdentity(_) => {
                "Unknown model. Use one of: local, openai, anthropic, google"
            }

            Self::Robot(_) => "The robot did not accept the command. Is Valetudo reachable?",
            Self::UnknownRoom(_) => "That room is not on the robot's map",

            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::AllBackendsExhausted | Self::PathCanonicalization(_, _) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::Config("bad log level".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad log level");

        let err = EngineError::UnknownModelIdentity("gpt5".to_string());
        assert_eq!(err.to_string(), "Unknown model identity: gpt5");
    }

    #[test]
    fn test_recoverability() {
        assert!(!EngineError::AllBackendsExhausted.is_recoverable());
        assert!(EngineError::Robot("timeout".to_string()).is_recoverable());
        assert!(EngineError::Network("refused".to_string()).is_recoverable());
    }

    #[test]
    fn test_hints_do_not_echo_payload() {
        let err = EngineError::Backend("sk-secret-value-that-should-not-leak".to_string());
        assert!(!err.user_hint().contains("sk-"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
