//! API key storage and lookup
//!
//! Online backends need an API key. Keys are looked up without ever prompting,
//! in this order: inline config value, environment variable, OS keychain
//! (service `valebot`, entry `<backend>_api_key`). See [`SecretCache::resolve`].
//!
//! [`scrub`] removes anything that looks like a credential from text that is
//! about to be logged or returned to a client.

pub mod cache;
pub mod string;

pub use cache::SecretCache;
pub use string::SecretString;

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

/// Keychain service name used for all Valebot entries
pub const KEYRING_SERVICE: &str = "valebot";

/// Thin wrapper over the OS keychain.
///
/// Secrets are stored in:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service (libsecret)
pub struct SecretManager {
    service_name: String,
}

static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Patterns match:
/// - OpenAI and Anthropic keys: sk-..., sk-ant-...
/// - Google API keys: AIza[0-9A-Za-z-_]{35}
/// - Bearer tokens: Bearer\s+[^\s]{20,}
/// - Query string keys: key=...
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"sk-[a-zA-Z0-9\-_]{20,}",
            r"AIza[0-9A-Za-z\-_]{35}",
            r"Bearer\s+[^\s]{20,}",
            r"key=[0-9A-Za-z\-_]{20,}",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Replace every detected credential in `text` with `[REDACTED]`.
///
/// ```
/// use valebot_engine::secrets::scrub;
///
/// let scrubbed = scrub("401: invalid key sk-1234567890abcdefghij");
/// assert_eq!(scrubbed, "401: invalid key [REDACTED]");
/// ```
pub fn scrub(text: &str) -> String {
    let mut result = text.to_string();

    for pattern in get_secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }

    result
}

impl SecretManager {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, EngineError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })
    }

    /// Look up a secret in the keychain. A missing entry is `Ok(None)`.
    pub fn get_secret(&self, key: &str) -> Result<Option<String>, EngineError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(Some(secret))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        self.entry(key)?.set_password(value).map_err(|e| {
            EngineError::KeyringError(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    pub fn delete_secret(&self, key: &str) -> Result<(), EngineError> {
        self.entry(key)?.delete_password().map_err(|e| {
            EngineError::KeyringError(format!("Failed to delete secret '{}': {}", key, e))
        })?;

        tracing::info!("Deleted secret '{}' from keychain", key);
        Ok(())
    }

    pub fn has_secret(&self, key: &str) -> bool {
        matches!(self.get_secret(key), Ok(Some(_)))
    }
}
