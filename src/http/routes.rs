//! HTTP route definitions

use axum::{
    extract::{Extension, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{anonymous_user_id, issue_token, AuthError};
use crate::game::{RoomId, UserId};
use crate::http::middleware::{require_auth, AuthenticatedUser};
use crate::map::{Platform, GROUND_NAME, GROUND_SIZE, GROUND_THICKNESS, PLATFORMS};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/map", get(map_handler))
        .route("/auth/anonymous", post(anonymous_login_handler))
        .route("/rooms/:room_id/ws", get(ws_handler));

    let protected_routes = Router::new()
        .route("/rooms", post(create_room_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    router
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.client_origins))
        .with_state(state)
}

/// An empty allow-list accepts any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(allowed))
            .allow_credentials(true)
    }
}

// ============================================================================
// Health and map
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_rooms: usize,
    active_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_rooms: state.registry.active_rooms(),
        active_players: state.registry.total_players(),
    })
}

#[derive(Serialize)]
struct GroundInfo {
    name: &'static str,
    size: f32,
    thickness: f32,
}

#[derive(Serialize)]
struct MapResponse {
    ground: GroundInfo,
    platforms: &'static [Platform],
}

async fn map_handler() -> Json<MapResponse> {
    Json(MapResponse {
        ground: GroundInfo {
            name: GROUND_NAME,
            size: GROUND_SIZE,
            thickness: GROUND_THICKNESS,
        },
        platforms: &PLATFORMS,
    })
}

// ============================================================================
// Sessions and rooms
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user_id: UserId,
    token: String,
    expires_in: u64,
}

async fn anonymous_login_handler(
    State(state): State<AppState>,
) -> Result<Json<LoginResponse>, AppError> {
    let user_id = anonymous_user_id();
    let token = issue_token(&user_id, &state.config.app_secret, state.config.token_ttl)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(user_id = %user_id, "Issued anonymous session");

    Ok(Json(LoginResponse {
        user_id,
        token,
        expires_in: state.config.token_ttl.as_secs(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomResponse {
    room_id: RoomId,
}

/// Hands out a fresh room id; the room materializes on first subscription
async fn create_room_handler(
    Extension(auth): Extension<AuthenticatedUser>,
) -> (StatusCode, Json<CreateRoomResponse>) {
    let room_id = Uuid::new_v4().simple().to_string();
    info!(room_id = %room_id, user_id = %auth.user_id, "Room id issued");

    (StatusCode::CREATED, Json(CreateRoomResponse { room_id }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Auth(e) => return e.into_response(),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
