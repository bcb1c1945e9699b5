//! Shared test doubles for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use valebot_engine::interpreter::Direction;
use valebot_engine::llm::{self, BackendId, LLMError, LLMProvider, Message};
use valebot_engine::robot::{self, Point, RobotControl, RobotError, RobotStatus, Segment};

/// Robot that records every call and reports a fixed position
#[derive(Default)]
pub struct FakeRobot {
    pub calls: Mutex<Vec<String>>,
    pub gotos: Mutex<Vec<(i64, i64)>>,
    pub position: Mutex<Option<Point>>,
    pub segments: Vec<Segment>,
    pub offline: AtomicBool,
}

impl FakeRobot {
    pub fn at(x: f64, y: f64) -> Self {
        let robot = Self::default();
        *robot.position.lock().unwrap() = Some(Point::new(x, y));
        robot
    }

    pub fn with_rooms(names: &[(&str, &str)]) -> Self {
        Self {
            segments: names
                .iter()
                .map(|(id, name)| Segment {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn gotos(&self) -> Vec<(i64, i64)> {
        self.gotos.lock().unwrap().clone()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn record(&self, call: impl Into<String>) -> robot::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RobotError::Network("connection refused".to_string()));
        }
        self.calls.lock().unwrap().push(call.into());
        Ok(())
    }
}

#[async_trait]
impl RobotControl for FakeRobot {
    async fn start_cleaning(&self) -> robot::Result<()> {
        self.record("start")
    }

    async fn stop_cleaning(&self) -> robot::Result<()> {
        self.record("stop")
    }

    async fn pause_cleaning(&self) -> robot::Result<()> {
        self.record("pause")
    }

    async fn return_to_dock(&self) -> robot::Result<()> {
        self.record("home")
    }

    async fn locate(&self) -> robot::Result<()> {
        self.record("locate")
    }

    async fn goto_location(&self, x: i64, y: i64) -> robot::Result<()> {
        self.record(format!("goto {} {}", x, y))?;
        self.gotos.lock().unwrap().push((x, y));
        Ok(())
    }

    async fn clean_segments(&self, ids: &[String]) -> robot::Result<()> {
        self.record(format!("segments {}", ids.join(",")))
    }

    async fn status(&self) -> robot::Result<RobotStatus> {
        self.record("status")?;
        Ok(RobotStatus {
            state: "docked".to_string(),
            battery: 92,
            error: None,
        })
    }

    async fn segments(&self) -> robot::Result<Vec<Segment>> {
        Ok(self.segments.clone())
    }

    async fn robot_position(&self) -> robot::Result<Option<Point>> {
        Ok(*self.position.lock().unwrap())
    }

    async fn manual_move(&self, direction: Direction) -> robot::Result<()> {
        self.record(format!("move {}", direction))
    }
}

/// Chat backend that answers with a fixed text, or always fails
pub struct ScriptedProvider {
    pub id: BackendId,
    pub reply: Option<String>,
    pub seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn answering(id: BackendId, reply: &str) -> Self {
        Self {
            id,
            reply: Some(reply.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(id: BackendId) -> Self {
        Self {
            id,
            reply: None,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn id(&self) -> BackendId {
        self.id
    }

    async fn chat_completion(&self, messages: &[Message]) -> llm::Result<String> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.reply.clone().ok_or(LLMError::RequestFailed {
            backend: self.id,
            reason: "scripted failure".to_string(),
        })
    }

    async fn check_health(&self) -> bool {
        self.reply.is_some()
    }
}
