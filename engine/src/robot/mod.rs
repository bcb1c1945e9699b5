//! Robot Control Capability
//!
//! The assistant and the follow tracker only see the [`RobotControl`] trait.
//! [`valetudo::ValetudoClient`] implements it against Valetudo's REST API; tests
//! substitute in-memory implementations.

use crate::interpreter::Direction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod valetudo;

pub use valetudo::ValetudoClient;

pub type Result<T> = std::result::Result<T, RobotError>;

#[derive(Debug, thiserror::Error)]
pub enum RobotError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Robot API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse robot response: {0}")]
    Parse(String),

    #[error("No room matching '{0}'")]
    UnknownRoom(String),

    #[error("Robot does not support {0}")]
    Unsupported(&'static str),
}

impl From<RobotError> for sdk::errors::EngineError {
    fn from(e: RobotError) -> Self {
        use sdk::errors::EngineError;

        match e {
            RobotError::UnknownRoom(room) => EngineError::UnknownRoom(room),
            RobotError::Network(msg) => EngineError::Network(msg),
            other => EngineError::Robot(other.to_string()),
        }
    }
}

/// State and battery snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotStatus {
    pub state: String,
    pub battery: u8,
    pub error: Option<String>,
}

/// A named cleaning zone (room) on the robot's map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub name: String,
}

/// Map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle for zone cleaning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

#[async_trait]
pub trait RobotControl: Send + Sync {
    async fn start_cleaning(&self) -> Result<()>;

    async fn stop_cleaning(&self) -> Result<()>;

    async fn pause_cleaning(&self) -> Result<()>;

    async fn return_to_dock(&self) -> Result<()>;

    /// Play the locate sound
    async fn locate(&self) -> Result<()>;

    async fn goto_location(&self, x: i64, y: i64) -> Result<()>;

    async fn clean_segments(&self, segment_ids: &[String]) -> Result<()>;

    async fn status(&self) -> Result<RobotStatus>;

    async fn segments(&self) -> Result<Vec<Segment>>;

    /// Current robot position, if the robot reports one
    async fn robot_position(&self) -> Result<Option<Point>> {
        Ok(None)
    }

    async fn manual_move(&self, _direction: Direction) -> Result<()> {
        Err(RobotError::Unsupported("manual control"))
    }

    async fn info(&self) -> Result<Value> {
        Ok(Value::Null)
    }

    async fn capabilities(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn clean_zones(&self, _zones: &[Zone], _iterations: u8) -> Result<()> {
        Err(RobotError::Unsupported("zone cleaning"))
    }

    async fn fan_speed_presets(&self) -> Result<Vec<String>> {
        Err(RobotError::Unsupported("fan speed control"))
    }

    async fn set_fan_speed(&self, _preset: &str) -> Result<()> {
        Err(RobotError::Unsupported("fan speed control"))
    }

    async fn water_usage_presets(&self) -> Result<Vec<String>> {
        Err(RobotError::Unsupported("water usage control"))
    }

    async fn set_water_usage(&self, _preset: &str) -> Result<()> {
        Err(RobotError::Unsupported("water usage control"))
    }

    async fn consumables(&self) -> Result<Value> {
        Err(RobotError::Unsupported("consumable monitoring"))
    }
}

/// Segment ids for the given room names.
///
/// A segment whose name equals the room (case-insensitive) wins; otherwise
/// the first segment where one name contains the other. Unnamed segments
/// never match.
pub fn resolve_rooms(segments: &[Segment], rooms: &[String]) -> Result<Vec<String>> {
    let named: Vec<(String, &Segment)> = segments
        .iter()
        .map(|s| (s.name.trim().to_lowercase(), s))
        .filter(|(name, _)| !name.is_empty())
        .collect();

    let mut ids = Vec::new();

    for room in rooms {
        let wanted = room.trim().to_lowercase();
        if wanted.is_empty() {
            return Err(RobotError::UnknownRoom(room.clone()));
        }

        let segment = named
            .iter()
            .find(|(name, _)| *name == wanted)
            .or_else(|| {
                named
                    .iter()
                    .find(|(name, _)| name.contains(&wanted) || wanted.contains(name.as_str()))
            })
            .map(|(_, s)| *s)
            .ok_or_else(|| RobotError::UnknownRoom(room.clone()))?;

        if !ids.contains(&segment.id) {
            ids.push(segment.id.clone());
        }
    }

    Ok(ids)
}
