//! Request handlers

use super::{ApiError, ServerState};
use crate::assistant::{ChatReply, CommandOutcome};
use crate::interpreter::{detect_language, response_template};
use crate::robot::{RobotStatus, Zone};
use crate::tracker::FollowState;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use sdk::types::{
    ChatRequest, ChatResponse, CommandRequest, FollowStateResponse, ModelSwitchRequest,
    ModelsResponse, ParsedCommandResponse, PositionSnapshot, PositionUpdate, RobotStatusResponse,
    StatusMessage, WsEvent, WsIncoming,
};
use serde::Deserialize;
use serde_json::{json, Value};

type ApiResult<T> = Result<Json<T>, ApiError>;

impl From<RobotStatus> for RobotStatusResponse {
    fn from(status: RobotStatus) -> Self {
        Self {
            state: status.state,
            battery: status.battery,
            error: status.error,
        }
    }
}

impl From<FollowState> for FollowStateResponse {
    fn from(state: FollowState) -> Self {
        Self {
            active: state.active,
            last_position: state.last_position.map(|p| PositionSnapshot {
                x: p.x,
                y: p.y,
                observed_at: p.received_at,
            }),
        }
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Valebot API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

pub async fn health(State(state): State<ServerState>) -> Json<Value> {
    let assistant = &state.assistant;

    let robot_ok = match assistant.robot().status().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Health check: robot unreachable: {}", e);
            false
        }
    };

    let report = assistant.health_report().await;
    let ai_ok = report.iter().any(|(_, healthy)| *healthy);
    let available: Vec<String> = report.iter().map(|(id, _)| id.to_string()).collect();

    Json(json!({
        "status": if robot_ok && ai_ok { "healthy" } else { "degraded" },
        "valetudo": if robot_ok { "connected" } else { "disconnected" },
        "ai": if ai_ok { "available" } else { "unavailable" },
        "available_models": available
    }))
}

pub async fn robot_status(State(state): State<ServerState>) -> ApiResult<RobotStatusResponse> {
    let status = state.assistant.robot().status().await?;
    Ok(Json(status.into()))
}

pub async fn robot_info(State(state): State<ServerState>) -> ApiResult<Value> {
    Ok(Json(state.assistant.robot().info().await?))
}

pub async fn robot_capabilities(State(state): State<ServerState>) -> ApiResult<Vec<String>> {
    Ok(Json(state.assistant.robot().capabilities().await?))
}

pub async fn robot_consumables(State(state): State<ServerState>) -> ApiResult<Value> {
    Ok(Json(state.assistant.robot().consumables().await?))
}

pub async fn robot_start(State(state): State<ServerState>) -> ApiResult<StatusMessage> {
    state.assistant.robot().start_cleaning().await?;
    Ok(Json(StatusMessage::success("Cleaning started")))
}

pub async fn robot_stop(State(state): State<ServerState>) -> ApiResult<StatusMessage> {
    state.assistant.tracker().stop_following();
    state.assistant.robot().stop_cleaning().await?;
    Ok(Json(StatusMessage::success("Cleaning stopped")))
}

pub async fn robot_pause(State(state): State<ServerState>) -> ApiResult<StatusMessage> {
    state.assistant.robot().pause_cleaning().await?;
    Ok(Json(StatusMessage::success("Cleaning paused")))
}

pub async fn robot_home(State(state): State<ServerState>) -> ApiResult<StatusMessage> {
    state.assistant.robot().return_to_dock().await?;
    Ok(Json(StatusMessage::success("Returning to dock")))
}

pub async fn robot_locate(State(state): State<ServerState>) -> ApiResult<StatusMessage> {
    state.assistant.robot().locate().await?;
    Ok(Json(StatusMessage::success("Playing locate sound")))
}

fn one_iteration() -> u8 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ZoneCleanRequest {
    pub zones: Vec<Zone>,
    #[serde(default = "one_iteration")]
    pub iterations: u8,
}

pub async fn robot_clean_zones(
    State(state): State<ServerState>,
    Json(request): Json<ZoneCleanRequest>,
) -> ApiResult<StatusMessage> {
    if request.zones.is_empty() {
        return Err(ApiError::BadRequest("At least one zone is required".to_string()));
    }

    state
        .assistant
        .robot()
        .clean_zones(&request.zones, request.iterations.max(1))
        .await?;
    Ok(Json(StatusMessage::success(format!(
        "Cleaning {} zone(s)",
        request.zones.len()
    ))))
}

#[derive(Debug, Deserialize)]
pub struct PresetRequest {
    pub preset: String,
}

pub async fn fan_speed_presets(State(state): State<ServerState>) -> ApiResult<Vec<String>> {
    Ok(Json(state.assistant.robot().fan_speed_presets().await?))
}

pub async fn set_fan_speed(
    State(state): State<ServerState>,
    Json(request): Json<PresetRequest>,
) -> ApiResult<StatusMessage> {
    state.assistant.robot().set_fan_speed(&request.preset).await?;
    Ok(Json(StatusMessage::success(format!(
        "Fan speed set to {}",
        request.preset
    ))))
}

pub async fn water_usage_presets(State(state): State<ServerState>) -> ApiResult<Vec<String>> {
    Ok(Json(state.assistant.robot().water_usage_presets().await?))
}

pub async fn set_water_usage(
    State(state): State<ServerState>,
    Json(request): Json<PresetRequest>,
) -> ApiResult<StatusMessage> {
    state
        .assistant
        .robot()
        .set_water_usage(&request.preset)
        .await?;
    Ok(Json(StatusMessage::success(format!(
        "Water usage set to {}",
        request.preset
    ))))
}

pub async fn chat(
    State(state): State<ServerState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".to_string()));
    }

    let reply = state
        .assistant
        .handle_chat(message, request.include_context)
        .await?;
    Ok(Json(reply.into_response()))
}

pub async fn models(State(state): State<ServerState>) -> Json<ModelsResponse> {
    let (current, available) = state.assistant.models().await;
    Json(ModelsResponse {
        current: current.to_string(),
        available: available.iter().map(|id| id.to_string()).collect(),
    })
}

pub async fn switch_model(
    State(state): State<ServerState>,
    Json(request): Json<ModelSwitchRequest>,
) -> ApiResult<Value> {
    let current = state.assistant.switch_model(&request.model).await?;
    Ok(Json(json!({
        "status": "success",
        "current_model": current
    })))
}

pub async fn clear_history(State(state): State<ServerState>) -> Json<StatusMessage> {
    state.assistant.clear_history().await;
    Json(StatusMessage::success("History cleared"))
}

pub async fn history(State(state): State<ServerState>) -> Json<Value> {
    Json(json!({ "history": state.assistant.history().await }))
}

pub async fn parse_command(
    State(state): State<ServerState>,
    Json(request): Json<CommandRequest>,
) -> Json<ParsedCommandResponse> {
    let language = detect_language(&request.command);

    let response = match state.assistant.parse(&request.command) {
        Some(command) => ParsedCommandResponse {
            language: language.code().to_string(),
            action: Some(command.action.to_string()),
            acknowledgement: response_template(&command, language),
            confidence: command.confidence,
            params: command.params,
        },
        None => ParsedCommandResponse {
            language: language.code().to_string(),
            action: None,
            params: Default::default(),
            confidence: 0.0,
            acknowledgement: None,
        },
    };

    Json(response)
}

pub async fn follow_state(State(state): State<ServerState>) -> Json<FollowStateResponse> {
    Json(state.assistant.tracker().state().into())
}

pub async fn update_position(
    State(state): State<ServerState>,
    Json(update): Json<PositionUpdate>,
) -> Json<StatusMessage> {
    state.assistant.tracker().update_position(update.x, update.y);
    Json(StatusMessage::success("Position updated"))
}

pub async fn follow_start(State(state): State<ServerState>) -> Json<StatusMessage> {
    let tracker = state.assistant.tracker();
    tracker.start_following();
    tracker.spawn(state.assistant.robot().clone());
    Json(StatusMessage::success("Follow mode started"))
}

pub async fn follow_stop(State(state): State<ServerState>) -> Json<StatusMessage> {
    state.assistant.tracker().stop_following();
    Json(StatusMessage::success("Follow mode stopped"))
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Frames to send back for one chat turn
pub(crate) fn reply_events(reply: &ChatReply) -> Vec<WsEvent> {
    let mut events = vec![WsEvent::Message {
        response: reply.response.clone(),
        model: reply.model_used.to_string(),
        intent: reply.intent(),
    }];

    match (&reply.command, &reply.outcome) {
        (Some(command), Some(Ok(outcome))) if outcome.executed() => {
            events.push(WsEvent::CommandExecuted {
                action: command.action.to_string(),
            });
        }
        (_, Some(Ok(CommandOutcome::Skipped(reason)))) => {
            tracing::debug!("Command skipped: {}", reason);
        }
        (_, Some(Err(e))) => events.push(WsEvent::Error {
            message: format!("Failed to execute command: {}", e),
        }),
        _ => {}
    }

    events
}

async fn handle_socket(mut socket: WebSocket, state: ServerState) {
    tracing::info!("WebSocket client connected");

    while let Some(frame) = socket.recv().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("WebSocket receive error: {}", e);
                break;
            }
        };

        let incoming: WsIncoming = match serde_json::from_str(&text) {
            Ok(incoming) => incoming,
            Err(e) => {
                let event = WsEvent::Error {
                    message: format!("Invalid message: {}", e),
                };
                if socket.send(WsMessage::Text(event.to_json())).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let message = incoming.message.trim();
        if message.is_empty() {
            continue;
        }

        let events = match state.assistant.handle_chat(message, true).await {
            Ok(reply) => reply_events(&reply),
            Err(e) => {
                tracing::error!("WebSocket chat error: {}", e);
                vec![WsEvent::Error {
                    message: crate::secrets::scrub(&e.to_string()),
                }]
            }
        };

        for event in events {
            if socket.send(WsMessage::Text(event.to_json())).await.is_err() {
                tracing::info!("WebSocket client went away");
                return;
            }
        }
    }

    tracing::info!("WebSocket client disconnected");
}
