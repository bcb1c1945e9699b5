//! Valetudo REST API v2 client

use super::{Point, Result, RobotControl, RobotError, RobotStatus, Segment, Zone};
use crate::config::ValetudoConfig;
use crate::interpreter::Direction;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

const BASIC_CONTROL: &str = "robot/capabilities/BasicControlCapability";
const LOCATE: &str = "robot/capabilities/LocateCapability";
const GO_TO_LOCATION: &str = "robot/capabilities/GoToLocationCapability";
const MAP_SEGMENTATION: &str = "robot/capabilities/MapSegmentationCapability";
const ZONE_CLEANING: &str = "robot/capabilities/ZoneCleaningCapability";
const FAN_SPEED: &str = "robot/capabilities/FanSpeedControlCapability";
const WATER_USAGE: &str = "robot/capabilities/WaterUsageControlCapability";
const CONSUMABLES: &str = "robot/capabilities/ConsumableMonitoringCapability";
const MANUAL_CONTROL: &str = "robot/capabilities/ManualControlCapability";

pub struct ValetudoClient {
    base_url: String,
    client: reqwest::Client,
}

impl ValetudoClient {
    pub fn new(config: &ValetudoConfig) -> Result<Self> {
        Self::with_base_url(config.base_url(), config.timeout())
    }

    /// `base_url` is the API root, e.g. `http://192.168.1.100/api/v2`
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RobotError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::info!("Valetudo client at {}", base_url);

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RobotError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value> {
        let url = self.url(endpoint);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RobotError::Network(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| RobotError::Parse(e.to_string()))
    }

    async fn put_json(&self, endpoint: &str, body: Value) -> Result<()> {
        let url = self.url(endpoint);
        tracing::debug!("PUT {} {}", url, body);

        let response = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RobotError::Network(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }

    async fn basic_control(&self, action: &str) -> Result<()> {
        self.put_json(BASIC_CONTROL, json!({ "action": action })).await
    }

    /// Raw `robot/state` document
    pub async fn state(&self) -> Result<Value> {
        self.get_json("robot/state").await
    }

    async fn presets(&self, capability: &str) -> Result<Vec<String>> {
        let data = self.get_json(&format!("{}/presets", capability)).await?;
        serde_json::from_value(data).map_err(|e| RobotError::Parse(e.to_string()))
    }

    async fn set_preset(&self, capability: &str, preset: &str) -> Result<()> {
        self.put_json(&format!("{}/preset", capability), json!({ "name": preset }))
            .await
    }
}

/// Build a status from the `robot/state/attributes` list
pub(crate) fn status_from_attributes(attributes: &Value) -> Result<RobotStatus> {
    let attributes = attributes
        .as_array()
        .ok_or_else(|| RobotError::Parse("state attributes are not a list".to_string()))?;

    let find = |class: &str| {
        attributes
            .iter()
            .find(|a| a.get("__class").and_then(|c| c.as_str()) == Some(class))
    };

    let status_attr = find("StatusStateAttribute");
    let state = status_attr
        .and_then(|a| a.get("value"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let battery = find("BatteryStateAttribute")
        .and_then(|a| a.get("level"))
        .and_then(|l| l.as_f64())
        .map(|l| l.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(0);

    let error = if state == "error" {
        status_attr
            .and_then(|a| a.pointer("/metaData/error_description"))
            .and_then(|e| e.as_str())
            .map(str::to_string)
            .or_else(|| Some("unknown error".to_string()))
    } else {
        None
    };

    Ok(RobotStatus {
        state,
        battery,
        error,
    })
}

/// Segments come back either as a bare list or wrapped in `{"segments": [...]}`
pub(crate) fn segments_from_value(data: &Value) -> Result<Vec<Segment>> {
    let list = data
        .as_array()
        .or_else(|| data.get("segments").and_then(|s| s.as_array()))
        .ok_or_else(|| RobotError::Parse("no segment list in response".to_string()))?;

    Ok(list
        .iter()
        .filter_map(|s| {
            let id = match s.get("id")? {
                Value::String(id) => id.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let name = s
                .get("name")
                .and_then(|n| n.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Segment {}", id));
            Some(Segment { id, name })
        })
        .collect())
}

/// First `robot_position` entity of a map document
pub(crate) fn robot_position_from_map(map: &Value) -> Option<Point> {
    let entity = map
        .get("entities")?
        .as_array()?
        .iter()
        .find(|e| e.get("type").and_then(|t| t.as_str()) == Some("robot_position"))?;

    let points = entity.get("points")?.as_array()?;
    Some(Point::new(points.first()?.as_f64()?, points.get(1)?.as_f64()?))
}

fn movement_command(direction: Direction) -> &'static str {
    match direction {
        Direction::Forward => "forward",
        Direction::Backward => "backward",
        Direction::Left => "rotate_counterclockwise",
        Direction::Right => "rotate_clockwise",
    }
}

#[async_trait]
impl RobotControl for ValetudoClient {
    async fn start_cleaning(&self) -> Result<()> {
        self.basic_control("start").await
    }

    async fn stop_cleaning(&self) -> Result<()> {
        self.basic_control("stop").await
    }

    async fn pause_cleaning(&self) -> Result<()> {
        self.basic_control("pause").await
    }

    async fn return_to_dock(&self) -> Result<()> {
        self.basic_control("home").await
    }

    async fn locate(&self) -> Result<()> {
        self.put_json(LOCATE, json!({ "action": "locate" })).await
    }

    async fn goto_location(&self, x: i64, y: i64) -> Result<()> {
        self.put_json(
            GO_TO_LOCATION,
            json!({ "action": "goto", "coordinates": { "x": x, "y": y } }),
        )
        .await
    }

    async fn clean_segments(&self, segment_ids: &[String]) -> Result<()> {
        self.put_json(
            MAP_SEGMENTATION,
            json!({
                "action": "start_segment_action",
                "segment_ids": segment_ids,
                "iterations": 1,
                "customOrder": true
            }),
        )
        .await
    }

    async fn status(&self) -> Result<RobotStatus> {
        let attributes = self.get_json("robot/state/attributes").await?;
        status_from_attributes(&attributes)
    }

    async fn segments(&self) -> Result<Vec<Segment>> {
        let data = self.get_json(MAP_SEGMENTATION).await?;
        segments_from_value(&data)
    }

    async fn robot_position(&self) -> Result<Option<Point>> {
        let map = self.get_json("robot/state/map").await?;
        Ok(robot_position_from_map(&map))
    }

    async fn manual_move(&self, direction: Direction) -> Result<()> {
        self.put_json(MANUAL_CONTROL, json!({ "action": "enable" }))
            .await?;
        self.put_json(
            MANUAL_CONTROL,
            json!({ "action": "move", "movementCommand": movement_command(direction) }),
        )
        .await
    }

    async fn info(&self) -> Result<Value> {
        self.get_json("robot").await
    }

    async fn capabilities(&self) -> Result<Vec<String>> {
        let data = self.get_json("robot/capabilities").await?;
        serde_json::from_value(data).map_err(|e| RobotError::Parse(e.to_string()))
    }

    async fn clean_zones(&self, zones: &[Zone], iterations: u8) -> Result<()> {
        let zones: Vec<Value> = zones
            .iter()
            .map(|z| {
                json!({
                    "points": {
                        "pA": { "x": z.x1, "y": z.y1 },
                        "pB": { "x": z.x2, "y": z.y1 },
                        "pC": { "x": z.x2, "y": z.y2 },
                        "pD": { "x": z.x1, "y": z.y2 }
                    }
                })
            })
            .collect();

        self.put_json(
            ZONE_CLEANING,
            json!({ "action": "clean", "zones": zones, "iterations": iterations }),
        )
        .await
    }

    async fn fan_speed_presets(&self) -> Result<Vec<String>> {
        self.presets(FAN_SPEED).await
    }

    async fn set_fan_speed(&self, preset: &str) -> Result<()> {
        self.set_preset(FAN_SPEED, preset).await
    }

    async fn water_usage_presets(&self) -> Result<Vec<String>> {
        self.presets(WATER_USAGE).await
    }

    async fn set_water_usage(&self, preset: &str) -> Result<()> {
        self.set_preset(WATER_USAGE, preset).await
    }

    async fn consumables(&self) -> Result<Value> {
        self.get_json(CONSUMABLES).await
    }
}
