//! Assistant session
//!
//! One explicitly constructed context object per process or session, holding
//! the orchestrator, interpreter, tracker and robot handle. The transports
//! (HTTP, WebSocket, CLI) share it behind an `Arc`.

use crate::config::Config;
use crate::interpreter::{Action, Command, CommandInterpreter, Language};
use crate::llm::orchestrator::ModelOrchestrator;
use crate::llm::prompts::SituationalContext;
use crate::llm::{BackendId, LLMError, Message};
use crate::robot::{self, RobotControl, RobotError, RobotStatus, ValetudoClient};
use crate::secrets::SecretCache;
use crate::tracker::FollowTracker;
use sdk::errors::EngineError;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of executing a classified command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Executed,
    Status(RobotStatus),
    /// Not executed, with the reason
    Skipped(String),
}

impl CommandOutcome {
    pub fn executed(&self) -> bool {
        !matches!(self, CommandOutcome::Skipped(_))
    }
}

/// Reply to one chat turn
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub model_used: BackendId,
    pub command: Option<Command>,
    /// Set when an actionable command was attempted
    pub outcome: Option<Result<CommandOutcome, String>>,
}

impl ChatReply {
    pub fn intent(&self) -> Option<String> {
        self.command.as_ref().map(|c| c.action.to_string())
    }

    pub fn executed(&self) -> bool {
        matches!(&self.outcome, Some(Ok(outcome)) if outcome.executed())
    }

    pub fn execution_note(&self) -> Option<String> {
        match &self.outcome {
            Some(Ok(CommandOutcome::Skipped(reason))) => Some(reason.clone()),
            Some(Err(e)) => Some(e.clone()),
            _ => None,
        }
    }

    pub fn into_response(self) -> sdk::types::ChatResponse {
        sdk::types::ChatResponse {
            intent: self.intent(),
            executed: self.executed(),
            execution_note: self.execution_note(),
            model_used: self.model_used.to_string(),
            response: self.response,
        }
    }
}

pub struct Assistant {
    orchestrator: Mutex<ModelOrchestrator>,
    interpreter: CommandInterpreter,
    tracker: FollowTracker,
    robot: Arc<dyn RobotControl>,
    threshold: f64,
}

impl Assistant {
    pub fn new(
        orchestrator: ModelOrchestrator,
        robot: Arc<dyn RobotControl>,
        tracker: FollowTracker,
        threshold: f64,
    ) -> Self {
        Self {
            orchestrator: Mutex::new(orchestrator),
            interpreter: CommandInterpreter::new(),
            tracker,
            robot,
            threshold,
        }
    }

    /// Wire everything up from configuration
    pub async fn from_config(config: &Config, secrets: &SecretCache) -> Result<Self, EngineError> {
        let robot = ValetudoClient::new(&config.valetudo)?;
        let orchestrator = ModelOrchestrator::initialize(&config.ai, secrets).await;

        Ok(Self::new(
            orchestrator,
            Arc::new(robot),
            FollowTracker::new(&config.follow),
            config.ai.command_threshold,
        ))
    }

    pub fn robot(&self) -> &Arc<dyn RobotControl> {
        &self.robot
    }

    pub fn tracker(&self) -> &FollowTracker {
        &self.tracker
    }

    pub fn parse(&self, text: &str) -> Option<Command> {
        self.interpreter.parse(text)
    }

    pub async fn language(&self) -> Language {
        self.orchestrator.lock().await.language()
    }

    /// Active backend and every backend with a client
    pub async fn models(&self) -> (BackendId, BTreeSet<BackendId>) {
        let orchestrator = self.orchestrator.lock().await;
        (orchestrator.active(), orchestrator.available_backends())
    }

    pub async fn switch_model(&self, name: &str) -> Result<BackendId, LLMError> {
        self.orchestrator.lock().await.switch_model(name)
    }

    pub async fn clear_history(&self) {
        self.orchestrator.lock().await.clear_history();
    }

    pub async fn history(&self) -> Vec<Message> {
        self.orchestrator.lock().await.history().to_vec()
    }

    pub async fn health_report(&self) -> Vec<(BackendId, bool)> {
        self.orchestrator.lock().await.health_report().await
    }

    /// Robot state, battery and room names. Whatever can't be fetched is left out.
    pub async fn situational_context(&self) -> Option<SituationalContext> {
        let mut context = SituationalContext::default();

        match self.robot.status().await {
            Ok(status) => {
                context.state = Some(status.state);
                context.battery = Some(status.battery);
            }
            Err(e) => tracing::warn!("Failed to get robot status for context: {}", e),
        }

        match self.robot.segments().await {
            Ok(segments) => context.rooms = segments.into_iter().map(|s| s.name).collect(),
            Err(e) => tracing::debug!("No segments for context: {}", e),
        }

        (!context.is_empty()).then_some(context)
    }

    /// Classify, reply, and execute the command if it clears the threshold.
    ///
    /// A failed reply is returned as an error and nothing is executed. A failed
    /// execution is logged and reported in the reply.
    pub async fn handle_chat(
        &self,
        message: &str,
        include_context: bool,
    ) -> Result<ChatReply, LLMError> {
        let context = if include_context {
            self.situational_context().await
        } else {
            None
        };

        let command = self.interpreter.parse(message);

        let (response, model_used) = {
            let mut orchestrator = self.orchestrator.lock().await;
            let response = orchestrator.chat(message, context.as_ref(), true).await?;
            (response, orchestrator.active())
        };

        let outcome = match &command {
            Some(cmd) if cmd.is_actionable(self.threshold) => {
                Some(self.execute(cmd).await.map_err(|e| {
                    tracing::error!("Failed to execute {}: {}", cmd.action, e);
                    e.to_string()
                }))
            }
            _ => None,
        };

        Ok(ChatReply {
            response,
            model_used,
            command,
            outcome,
        })
    }

    /// Run a command against the robot
    pub async fn execute(&self, command: &Command) -> Result<CommandOutcome, RobotError> {
        tracing::info!(
            "Executing {} (confidence {})",
            command.action,
            command.confidence
        );

        match command.action {
            Action::StartCleaning => self.robot.start_cleaning().await?,
            Action::CleanRooms => {
                let rooms = command.rooms();
                let segments = self.robot.segments().await?;
                let ids = robot::resolve_rooms(&segments, &rooms)?;
                self.robot.clean_segments(&ids).await?;
            }
            Action::Stop => {
                self.tracker.stop_following();
                self.robot.stop_cleaning().await?;
            }
            Action::Pause => self.robot.pause_cleaning().await?,
            Action::Home => self.robot.return_to_dock().await?,
            Action::Locate => self.robot.locate().await?,
            Action::Status => return Ok(CommandOutcome::Status(self.robot.status().await?)),
            Action::FollowMe => {
                self.tracker.start_following();
                self.tracker.spawn(self.robot.clone());
            }
            Action::GotoRoom => {
                return Ok(CommandOutcome::Skipped(format!(
                    "No coordinates known for room '{}'",
                    command.room().unwrap_or_default()
                )));
            }
            Action::GotoLocation => {
                return Ok(CommandOutcome::Skipped(
                    "No target coordinates given".to_string(),
                ));
            }
            Action::Move => match command.direction() {
                Some(direction) => self.robot.manual_move(direction).await?,
                None => {
                    return Ok(CommandOutcome::Skipped(
                        "No movement direction given".to_string(),
                    ))
                }
            },
        }

        Ok(CommandOutcome::Executed)
    }
}
