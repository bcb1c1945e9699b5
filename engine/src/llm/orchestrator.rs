//! Model Orchestrator
//!
//! Owns the active backend selection, the conversation history and the
//! one-shot fallback protocol. Each `chat` call makes at most two backend
//! requests: one to the active backend and, if that fails and auto-fallback is
//! on, one to the alternate (Local <-> online default). A fallback switch is
//! sticky: the next call starts from the backend that answered.
//!
//! History is append-only. Only the last `history_window` entries are sent
//! with a request; older entries stay available through [`ModelOrchestrator::history`].

use super::local::LocalProvider;
use super::prompts::{self, SituationalContext};
use super::{anthropic, gemini, openai};
use super::{BackendId, LLMError, LLMProvider, Message, Result};
use crate::config::AiConfig;
use crate::interpreter::Language;
use crate::secrets::SecretCache;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub struct ModelOrchestrator {
    providers: HashMap<BackendId, Arc<dyn LLMProvider>>,
    active: BackendId,
    language: Language,
    auto_fallback: bool,
    online_default: BackendId,
    window: usize,
    history: Vec<Message>,
}

impl ModelOrchestrator {
    /// Build every enabled backend from config.
    ///
    /// A backend that can't be constructed (or an online backend without an
    /// API key) is logged and left out. If the local backend is active and
    /// fails its health probe, the online default becomes active before any
    /// chat happens.
    pub async fn initialize(config: &AiConfig, secrets: &SecretCache) -> Self {
        let mut providers: Vec<Arc<dyn LLMProvider>> = Vec::new();

        if config.local.enabled {
            match LocalProvider::new(config.local.clone()) {
                Ok(p) => providers.push(Arc::new(p)),
                Err(e) => tracing::warn!("Local backend unavailable: {}", e),
            }
        }

        for id in [BackendId::OpenAI, BackendId::Anthropic, BackendId::Google] {
            let Some(cfg) = config.online.provider(id).filter(|c| c.enabled) else {
                continue;
            };

            let Some(api_key) = secrets.resolve(id, cfg.api_key.as_deref()) else {
                tracing::warn!(
                    "No API key for '{}' (set {} or store '{}' in the keychain)",
                    id,
                    id.env_var().unwrap_or_default(),
                    SecretCache::key_name(id)
                );
                continue;
            };

            let built: Result<Arc<dyn LLMProvider>> = match id {
                BackendId::OpenAI => openai::OpenAIProvider::new(cfg.clone(), api_key)
                    .map(|p| Arc::new(p) as Arc<dyn LLMProvider>),
                BackendId::Anthropic => anthropic::AnthropicProvider::new(cfg.clone(), api_key)
                    .map(|p| Arc::new(p) as Arc<dyn LLMProvider>),
                BackendId::Google => gemini::GoogleProvider::new(cfg.clone(), api_key)
                    .map(|p| Arc::new(p) as Arc<dyn LLMProvider>),
                BackendId::Local => continue,
            };

            match built {
                Ok(p) => providers.push(p),
                Err(e) => tracing::warn!("Backend '{}' unavailable: {}", id, e),
            }
        }

        let mut orchestrator = Self::with_providers(providers, config);

        if orchestrator.auto_fallback && orchestrator.active == BackendId::Local {
            let healthy = match orchestrator.providers.get(&BackendId::Local) {
                Some(local) => local.check_health().await,
                None => false,
            };

            if !healthy {
                tracing::warn!(
                    "Local backend failed its health probe, switching to '{}'",
                    orchestrator.online_default
                );
                orchestrator.active = orchestrator.online_default;
            }
        }

        tracing::info!(
            "Model orchestrator ready: active={}, available={:?}",
            orchestrator.active,
            orchestrator.available_backends()
        );

        orchestrator
    }

    /// Build an orchestrator over already constructed backends
    pub fn with_providers(providers: Vec<Arc<dyn LLMProvider>>, config: &AiConfig) -> Self {
        Self {
            providers: providers.into_iter().map(|p| (p.id(), p)).collect(),
            active: config.default_model,
            language: config.language,
            auto_fallback: config.auto_fallback,
            online_default: config.online.default_provider,
            window: config.history_window,
            history: Vec::new(),
        }
    }

    /// Produce one reply, falling back to the alternate backend at most once.
    ///
    /// On success with `add_to_history`, the original message and the reply are
    /// appended. On failure nothing is recorded.
    pub async fn chat(
        &mut self,
        message: &str,
        context: Option<&SituationalContext>,
        add_to_history: bool,
    ) -> Result<String> {
        let messages = self.build_messages(message, context);
        let mut fallback_attempted = false;

        loop {
            let backend = self.active;
            let error = match self.call_backend(backend, &messages).await {
                Ok(reply) => {
                    if add_to_history {
                        self.history.push(Message::user(message));
                        self.history.push(Message::assistant(reply.clone()));
                    }
                    return Ok(reply);
                }
                Err(e) => e,
            };

            tracing::warn!("Backend '{}' failed: {}", backend, error);

            if !self.auto_fallback {
                return Err(error);
            }

            if fallback_attempted {
                return Err(LLMError::AllBackendsExhausted {
                    last_error: Box::new(error),
                });
            }
            fallback_attempted = true;

            match self.fallback_target(backend) {
                Some(target) => {
                    tracing::info!("Falling back from '{}' to '{}'", backend, target);
                    self.active = target;
                }
                None => {
                    tracing::error!("No fallback path from '{}'", backend);
                    return Err(LLMError::AllBackendsExhausted {
                        last_error: Box::new(error),
                    });
                }
            }
        }
    }

    async fn call_backend(&self, backend: BackendId, messages: &[Message]) -> Result<String> {
        let provider = self
            .providers
            .get(&backend)
            .ok_or(LLMError::BackendUnavailable(backend))?;

        tracing::debug!("Sending {} messages to '{}'", messages.len(), backend);
        provider.chat_completion(messages).await
    }

    /// Local falls back to the online default; online backends fall back to
    /// Local when it exists.
    fn fallback_target(&self, failed: BackendId) -> Option<BackendId> {
        if failed == BackendId::Local {
            Some(self.online_default)
        } else if self.providers.contains_key(&BackendId::Local) {
            Some(BackendId::Local)
        } else {
            None
        }
    }

    fn build_messages(&self, message: &str, context: Option<&SituationalContext>) -> Vec<Message> {
        let window = self.context_window();
        let mut messages = Vec::with_capacity(window.len() + 2);

        messages.push(Message::system(prompts::system_prompt(self.language)));
        messages.extend_from_slice(window);
        messages.push(Message::user(prompts::format_user_message(
            message,
            context,
            self.language,
        )));

        messages
    }

    /// Set the active backend by name.
    pub fn switch_model(&mut self, name: &str) -> Result<BackendId> {
        let id: BackendId = name.parse()?;
        self.set_active(id);
        Ok(id)
    }

    pub fn set_active(&mut self, id: BackendId) {
        if !self.providers.contains_key(&id) {
            tracing::warn!("Switching to '{}', which has no client", id);
        }
        self.active = id;
    }

    pub fn active(&self) -> BackendId {
        self.active
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Full stored history
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// The entries that go out with the next request
    pub fn context_window(&self) -> &[Message] {
        let start = self.history.len().saturating_sub(self.window);
        &self.history[start..]
    }

    /// Backends with a live client
    pub fn available_backends(&self) -> BTreeSet<BackendId> {
        self.providers.keys().copied().collect()
    }

    /// Probe every live backend
    pub async fn health_report(&self) -> Vec<(BackendId, bool)> {
        let mut results = Vec::new();
        for id in self.available_backends() {
            if let Some(provider) = self.providers.get(&id) {
                results.push((id, provider.check_health().await));
            }
        }
        results
    }
}
