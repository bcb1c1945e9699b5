use crate::llm::BackendId;
use crate::secrets::string::SecretString;
use crate::secrets::{SecretManager, KEYRING_SERVICE};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Resolves and memoizes backend API keys.
///
/// Lookup order for [`resolve`](Self::resolve): inline config value, cache,
/// the backend's environment variable, then the OS keychain. Nothing here
/// prompts; a key that can't be found is simply absent.
#[derive(Clone)]
pub struct SecretCache {
    manager: Option<Arc<SecretManager>>,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretCache {
    /// Cache backed by the given keychain manager
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager: Some(manager),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Cache backed by the `valebot` keychain service
    pub fn system() -> Self {
        Self::new(Arc::new(SecretManager::new(KEYRING_SERVICE)))
    }

    /// Cache that never touches the keychain. Only inline values, inserted
    /// values and environment variables resolve.
    pub fn offline() -> Self {
        Self {
            manager: None,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Keychain entry name for a backend, e.g. `openai_api_key`
    pub fn key_name(backend: BackendId) -> String {
        format!("{}_api_key", backend)
    }

    /// Seed a key for a backend
    pub fn insert(&self, backend: BackendId, value: impl Into<SecretString>) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(Self::key_name(backend), value.into());
    }

    /// Find the API key for `backend`, or `None` when no source has one.
    pub fn resolve(&self, backend: BackendId, inline: Option<&str>) -> Option<SecretString> {
        if let Some(value) = inline.filter(|v| !v.trim().is_empty()) {
            return Some(SecretString::new(value));
        }

        let key = Self::key_name(backend);
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(secret) = cache.get(&key) {
                return Some(secret.clone());
            }
        }

        let found = backend
            .env_var()
            .and_then(|var| std::env::var(var).ok())
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.from_keychain(&key))?;

        let secret = SecretString::new(found);
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(key, secret.clone());

        Some(secret)
    }

    fn from_keychain(&self, key: &str) -> Option<String> {
        let manager = self.manager.as_ref()?;
        match manager.get_secret(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Keychain lookup for '{}' failed: {}", key, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_value_wins() {
        let cache = SecretCache::offline();
        cache.insert(BackendId::OpenAI, "from-cache");

        let secret = cache.resolve(BackendId::OpenAI, Some("inline-key")).unwrap();
        assert_eq!(secret.unsecure(), "inline-key");
    }

    #[test]
    fn test_blank_inline_value_is_ignored() {
        let cache = SecretCache::offline();
        cache.insert(BackendId::Anthropic, "from-cache");

        let secret = cache.resolve(BackendId::Anthropic, Some("  ")).unwrap();
        assert_eq!(secret.unsecure(), "from-cache");
    }

    #[test]
    fn test_local_backend_has_no_env_var() {
        let cache = SecretCache::offline();
        assert!(cache.resolve(BackendId::Local, None).is_none());
    }

    #[test]
    fn test_key_name() {
        assert_eq!(SecretCache::key_name(BackendId::Google), "google_api_key");
    }
}
