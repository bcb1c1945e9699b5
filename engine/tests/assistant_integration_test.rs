//! Integration tests for chat turns end to end: classification, reply and
//! command execution against a fake robot.

mod common;

use common::{FakeRobot, ScriptedProvider};
use std::sync::Arc;

use valebot_engine::assistant::{Assistant, CommandOutcome};
use valebot_engine::config::AiConfig;
use valebot_engine::interpreter::{parse_command, Action, Language};
use valebot_engine::llm::orchestrator::ModelOrchestrator;
use valebot_engine::llm::{BackendId, LLMError, LLMProvider};
use valebot_engine::tracker::FollowTracker;

fn assistant_with(robot: Arc<FakeRobot>, providers: Vec<Arc<dyn LLMProvider>>) -> Assistant {
    let config = AiConfig {
        language: Language::Polish,
        ..AiConfig::default()
    };
    let orchestrator = ModelOrchestrator::with_providers(providers, &config);
    Assistant::new(orchestrator, robot, FollowTracker::default(), 0.7)
}

fn local_answering(reply: &str) -> Vec<Arc<dyn LLMProvider>> {
    vec![Arc::new(ScriptedProvider::answering(BackendId::Local, reply))]
}

#[tokio::test]
async fn test_polish_room_cleaning_resolves_segments() {
    let robot = Arc::new(FakeRobot::with_rooms(&[("16", "Kuchnia"), ("17", "Salon")]));
    let assistant = assistant_with(robot.clone(), local_answering("Już sprzątam kuchnię."));

    let reply = assistant
        .handle_chat("posprzątaj kuchnię i salon", false)
        .await
        .unwrap();

    assert_eq!(reply.response, "Już sprzątam kuchnię.");
    assert_eq!(reply.intent().as_deref(), Some("clean_rooms"));
    assert!(reply.executed());
    assert_eq!(robot.calls(), vec!["segments 17,16"]);
}

#[tokio::test]
async fn test_unknown_room_is_reported_not_raised() {
    let robot = Arc::new(FakeRobot::with_rooms(&[("16", "Kitchen")]));
    let assistant = assistant_with(robot.clone(), local_answering("On it."));

    let reply = assistant
        .handle_chat("clean the bathroom", false)
        .await
        .unwrap();

    assert!(!reply.executed());
    assert!(reply.execution_note().unwrap().contains("bathroom"));
    assert!(robot.calls().is_empty());
}

#[tokio::test]
async fn test_robot_failure_does_not_fail_the_chat() {
    let robot = Arc::new(FakeRobot::default());
    robot.set_offline(true);
    let assistant = assistant_with(robot, local_answering("Returning."));

    let reply = assistant.handle_chat("go home", false).await.unwrap();

    assert_eq!(reply.response, "Returning.");
    assert!(!reply.executed());
    assert!(reply
        .execution_note()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn test_plain_chat_executes_nothing() {
    let robot = Arc::new(FakeRobot::default());
    let assistant = assistant_with(robot.clone(), local_answering("Hi!"));

    let reply = assistant.handle_chat("good morning", false).await.unwrap();

    assert!(reply.command.is_none());
    assert!(reply.outcome.is_none());
    assert!(robot.calls().is_empty());
}

#[tokio::test]
async fn test_command_at_threshold_is_not_executed() {
    let robot = Arc::new(FakeRobot::default());
    let assistant = assistant_with(robot.clone(), local_answering("Where to?"));

    // goto_location classifies at exactly 0.7
    let reply = assistant.handle_chat("go to the window", false).await.unwrap();

    assert_eq!(reply.intent().as_deref(), Some("goto_location"));
    assert!(reply.outcome.is_none());
    assert!(robot.calls().is_empty());
}

#[tokio::test]
async fn test_failed_chat_executes_nothing() {
    let robot = Arc::new(FakeRobot::default());
    let assistant = assistant_with(
        robot.clone(),
        vec![Arc::new(ScriptedProvider::failing(BackendId::Local))],
    );

    let err = assistant.handle_chat("stop", false).await.unwrap_err();

    // No online backend to fall back to
    assert!(matches!(err, LLMError::AllBackendsExhausted { .. }));
    assert!(robot.calls().is_empty());
    assert!(assistant.history().await.is_empty());
}

#[tokio::test]
async fn test_context_is_gathered_from_the_robot() {
    let robot = Arc::new(FakeRobot::with_rooms(&[("1", "Sypialnia")]));
    let provider = Arc::new(ScriptedProvider::answering(BackendId::Local, "Dobrze."));
    let assistant = assistant_with(robot, vec![provider.clone()]);

    assistant.handle_chat("co słychać?", true).await.unwrap();

    let seen = provider.seen.lock().unwrap();
    let user = &seen[0].last().unwrap().content;
    assert_eq!(
        user,
        "Stan robota: w stacji dokującej\nBateria: 92%\nDostępne pokoje: Sypialnia\n\nUżytkownik: co słychać?"
    );
}

#[tokio::test(start_paused = true)]
async fn test_follow_me_then_stop() {
    let robot = Arc::new(FakeRobot::at(0.0, 0.0));
    let assistant = assistant_with(robot.clone(), local_answering("Jadę."));

    assistant.tracker().update_position(2_000, 0);
    let reply = assistant.handle_chat("jedź za mną", false).await.unwrap();
    assert_eq!(reply.intent().as_deref(), Some("follow_me"));
    assert!(assistant.tracker().is_following());

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(robot.gotos(), vec![(2_000, 0)]);

    let reply = assistant.handle_chat("stop", false).await.unwrap();
    assert_eq!(reply.intent().as_deref(), Some("stop"));
    assert!(!assistant.tracker().is_following());
    assert!(robot.calls().contains(&"stop".to_string()));
}

#[tokio::test]
async fn test_execute_status_and_skips() {
    let robot = Arc::new(FakeRobot::default());
    let assistant = assistant_with(robot, local_answering(""));

    let status = parse_command("battery status").unwrap();
    assert_eq!(status.action, Action::Status);
    match assistant.execute(&status).await.unwrap() {
        CommandOutcome::Status(s) => assert_eq!(s.battery, 92),
        other => panic!("unexpected outcome {:?}", other),
    }

    let goto_room = parse_command("go to the kitchen").unwrap();
    assert_eq!(goto_room.action, Action::GotoRoom);
    assert!(matches!(
        assistant.execute(&goto_room).await.unwrap(),
        CommandOutcome::Skipped(_)
    ));
}

#[tokio::test]
async fn test_manual_move() {
    let robot = Arc::new(FakeRobot::default());
    let assistant = assistant_with(robot.clone(), local_answering("Turning."));

    let reply = assistant.handle_chat("turn left", false).await.unwrap();

    assert!(reply.executed());
    assert_eq!(robot.calls(), vec!["move left"]);
}

#[tokio::test]
async fn test_switch_model_and_models() {
    let assistant = assistant_with(
        Arc::new(FakeRobot::default()),
        vec![
            Arc::new(ScriptedProvider::answering(BackendId::Local, "a")),
            Arc::new(ScriptedProvider::answering(BackendId::Google, "b")),
        ],
    );

    assert_eq!(
        assistant.switch_model("google").await.unwrap(),
        BackendId::Google
    );
    let (active, available) = assistant.models().await;
    assert_eq!(active, BackendId::Google);
    assert_eq!(available.len(), 2);

    assert!(assistant.switch_model("gpt-5").await.is_err());
}
