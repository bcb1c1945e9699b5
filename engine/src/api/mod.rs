//! HTTP and WebSocket transport
//!
//! REST endpoints live under `/api/v1`, the chat WebSocket at `/ws/chat`.
//!
//! # Endpoints
//!
//! - GET /api/v1/ - Service banner
//! - GET /api/v1/health - Robot and backend availability
//! - GET /api/v1/robot/status|info|capabilities|consumables
//! - POST /api/v1/robot/start|stop|pause|home|locate
//! - GET/PUT /api/v1/robot/fan-speed, /api/v1/robot/water-usage
//! - POST /api/v1/robot/zones - Clean rectangles
//! - POST /api/v1/chat - One chat turn
//! - GET /api/v1/ai/models, POST /api/v1/ai/switch-model
//! - POST /api/v1/ai/clear-history, GET /api/v1/ai/history
//! - POST /api/v1/command/parse - Classify without executing
//! - GET /api/v1/follow, POST /api/v1/follow/position|start|stop
//! - GET /ws/chat - Chat over WebSocket

mod error;
mod routes;

pub use error::ApiError;

use crate::assistant::Assistant;
use crate::config::ApiConfig;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use sdk::errors::EngineError;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;

/// Shared across handlers
#[derive(Clone)]
pub struct ServerState {
    pub assistant: Arc<Assistant>,
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// Build the full application router
pub fn router(assistant: Arc<Assistant>, config: &ApiConfig) -> Router {
    let state = ServerState { assistant };

    let api = Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/robot/status", get(routes::robot_status))
        .route("/robot/info", get(routes::robot_info))
        .route("/robot/capabilities", get(routes::robot_capabilities))
        .route("/robot/consumables", get(routes::robot_consumables))
        .route("/robot/start", post(routes::robot_start))
        .route("/robot/stop", post(routes::robot_stop))
        .route("/robot/pause", post(routes::robot_pause))
        .route("/robot/home", post(routes::robot_home))
        .route("/robot/locate", post(routes::robot_locate))
        .route("/robot/zones", post(routes::robot_clean_zones))
        .route(
            "/robot/fan-speed",
            get(routes::fan_speed_presets).put(routes::set_fan_speed),
        )
        .route(
            "/robot/water-usage",
            get(routes::water_usage_presets).put(routes::set_water_usage),
        )
        .route("/chat", post(routes::chat))
        .route("/ai/models", get(routes::models))
        .route("/ai/switch-model", post(routes::switch_model))
        .route("/ai/clear-history", post(routes::clear_history))
        .route("/ai/history", get(routes::history))
        .route("/command/parse", post(routes::parse_command))
        .route("/follow", get(routes::follow_state))
        .route("/follow/position", post(routes::update_position))
        .route("/follow/start", post(routes::follow_start))
        .route("/follow/stop", post(routes::follow_stop));

    let app = Router::new()
        .route("/api/v1/", get(routes::root))
        .nest("/api/v1", api)
        .route("/ws/chat", get(routes::websocket_handler))
        .layer(cors_layer(config))
        .with_state(state);

    match &config.static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}

/// Bind and serve until `shutdown` resolves
pub async fn serve(
    assistant: Arc<Assistant>,
    config: &ApiConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), EngineError> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, router(assistant, config))
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("API server shutting down gracefully");
        })
        .await
        .map_err(|e| EngineError::Network(format!("API server error: {}", e)))
}
