//! Integration tests for the model orchestrator against HTTP backends
//!
//! The local server and OpenAI are stood in for by wiremock servers, so these
//! run without network access or API keys.

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use valebot_engine::config::{AiConfig, LocalConfig, OnlineConfig, OnlineProviderConfig};
use valebot_engine::interpreter::Language;
use valebot_engine::llm::orchestrator::ModelOrchestrator;
use valebot_engine::llm::prompts::SituationalContext;
use valebot_engine::llm::{BackendId, LLMError};
use valebot_engine::secrets::SecretCache;

const TEST_KEY: &str = "sk-test-0000000000000000000000";

fn completion(text: &str) -> serde_json::Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    })
}

fn ai_config(local: &MockServer, openai: &MockServer) -> AiConfig {
    AiConfig {
        language: Language::English,
        local: LocalConfig {
            base_url: format!("{}/v1", local.uri()),
            timeout_secs: 5,
            ..LocalConfig::default()
        },
        online: OnlineConfig {
            default_provider: BackendId::OpenAI,
            openai: OnlineProviderConfig {
                api_key: Some(TEST_KEY.to_string()),
                base_url: format!("{}/v1", openai.uri()),
                timeout_secs: 5,
                ..OnlineProviderConfig::openai()
            },
            anthropic: OnlineProviderConfig::anthropic(),
            google: OnlineProviderConfig::google(),
        },
        ..AiConfig::default()
    }
}

async fn mount_local_health(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "data": [] })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_unhealthy_local_switches_to_online_default_at_startup() {
    let local = MockServer::start().await;
    let openai = MockServer::start().await;
    mount_local_health(&local, 500).await;

    let orchestrator =
        ModelOrchestrator::initialize(&ai_config(&local, &openai), &SecretCache::offline()).await;

    assert_eq!(orchestrator.active(), BackendId::OpenAI);
    assert!(orchestrator.available_backends().contains(&BackendId::Local));
    assert!(orchestrator.available_backends().contains(&BackendId::OpenAI));
}

#[tokio::test]
async fn test_healthy_local_stays_active() {
    let local = MockServer::start().await;
    let openai = MockServer::start().await;
    mount_local_health(&local, 200).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "local-model", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hello from LM Studio")))
        .expect(1)
        .mount(&local)
        .await;

    let mut orchestrator =
        ModelOrchestrator::initialize(&ai_config(&local, &openai), &SecretCache::offline()).await;
    assert_eq!(orchestrator.active(), BackendId::Local);

    let reply = orchestrator.chat("hello", None, true).await.unwrap();
    assert_eq!(reply, "Hello from LM Studio");
    assert_eq!(orchestrator.history().len(), 2);
}

#[tokio::test]
async fn test_failed_local_chat_falls_back_to_openai() {
    let local = MockServer::start().await;
    let openai = MockServer::start().await;
    mount_local_health(&local, 200).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model not loaded"))
        .expect(1)
        .mount(&local)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", format!("Bearer {}", TEST_KEY).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Cloud reply")))
        .expect(2)
        .mount(&openai)
        .await;

    let mut orchestrator =
        ModelOrchestrator::initialize(&ai_config(&local, &openai), &SecretCache::offline()).await;

    let reply = orchestrator.chat("status?", None, true).await.unwrap();
    assert_eq!(reply, "Cloud reply");
    assert_eq!(orchestrator.active(), BackendId::OpenAI);

    // Sticky: the next call goes straight to OpenAI
    orchestrator.chat("and now?", None, true).await.unwrap();
    assert_eq!(orchestrator.history().len(), 4);
}

#[tokio::test]
async fn test_both_backends_failing_exhausts() {
    let local = MockServer::start().await;
    let openai = MockServer::start().await;
    mount_local_health(&local, 200).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&local)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&openai)
        .await;

    let mut orchestrator =
        ModelOrchestrator::initialize(&ai_config(&local, &openai), &SecretCache::offline()).await;

    let err = orchestrator.chat("hello", None, true).await.unwrap_err();
    match err {
        LLMError::AllBackendsExhausted { last_error } => {
            assert!(matches!(
                *last_error,
                LLMError::AuthenticationFailed(BackendId::OpenAI)
            ));
        }
        other => panic!("expected AllBackendsExhausted, got {:?}", other),
    }
    assert!(orchestrator.history().is_empty());
}

#[tokio::test]
async fn test_context_reaches_the_backend() {
    let local = MockServer::start().await;
    let openai = MockServer::start().await;
    mount_local_health(&local, 200).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .mount(&local)
        .await;

    let mut orchestrator =
        ModelOrchestrator::initialize(&ai_config(&local, &openai), &SecretCache::offline()).await;

    let context = SituationalContext {
        state: Some("docked".to_string()),
        battery: Some(64),
        rooms: vec!["Kitchen".to_string()],
    };
    orchestrator
        .chat("clean the kitchen", Some(&context), true)
        .await
        .unwrap();

    let requests = local.received_requests().await.unwrap();
    let chat = requests
        .iter()
        .find(|r| r.url.path() == "/v1/chat/completions")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&chat.body).unwrap();
    let messages = body["messages"].as_array().unwrap();

    assert_eq!(messages[0]["role"], "system");
    let last = messages.last().unwrap()["content"].as_str().unwrap();
    assert!(last.starts_with("Robot state: docked\nBattery: 64%"));
    assert!(last.ends_with("User: clean the kitchen"));

    // History keeps the raw message, not the context block
    assert_eq!(orchestrator.history()[0].content, "clean the kitchen");
}
