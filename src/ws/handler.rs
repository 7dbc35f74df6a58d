//! WebSocket upgrade handler and per-connection session

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use bytes::Bytes;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::auth::verify_token;
use crate::game::{RoomId, RoomRegistry, UserId};
use crate::http::AppError;
use crate::physics::PhysicsWorld;
use crate::util::rate_limit::InputRateLimiter;

/// Longest room id accepted in the upgrade path
const MAX_ROOM_ID_LEN: usize = 64;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Session token for authentication
    pub token: String,
}

/// WebSocket upgrade handler. Unauthenticated connections never reach a room.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<RoomId>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if room_id.is_empty() || room_id.len() > MAX_ROOM_ID_LEN {
        return Err(AppError::BadRequest("Invalid room id".to_string()));
    }

    let claims = verify_token(&query.token, &state.config.app_secret).map_err(|e| {
        warn!(room_id = %room_id, error = %e, "WebSocket auth failed");
        e
    })?;

    info!(room_id = %room_id, user_id = %claims.sub, "WebSocket upgrade for authenticated user");
    let registry = state.registry.clone();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, room_id, claims.sub, registry)))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket<W: PhysicsWorld + Default + 'static>(
    socket: WebSocket,
    room_id: RoomId,
    user_id: UserId,
    registry: std::sync::Arc<RoomRegistry<W>>,
) {
    let snapshot_rx = registry.subscribe_user(&room_id, &user_id);
    info!(room_id = %room_id, user_id = %user_id, "Player joined room");

    let (ws_sink, ws_stream) = socket.split();
    run_session(&registry, &room_id, &user_id, ws_sink, ws_stream, snapshot_rx).await;

    registry.unsubscribe_user(&room_id, &user_id);
    info!(room_id = %room_id, user_id = %user_id, "WebSocket connection closed");
}

/// Run the session until either side closes. A closed snapshot channel means the room is gone.
async fn run_session<W: PhysicsWorld + Default>(
    registry: &RoomRegistry<W>,
    room_id: &str,
    user_id: &str,
    ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    snapshot_rx: broadcast::Receiver<Bytes>,
) {
    let rate_limiter = InputRateLimiter::new();

    // Writer task: room snapshots -> WebSocket
    let mut writer_handle = tokio::spawn(forward_snapshots(
        room_id.to_string(),
        user_id.to_string(),
        ws_sink,
        snapshot_rx,
    ));

    // Reader loop: WebSocket -> room inbox
    let reader = async {
        while let Some(result) = ws_stream.next().await {
            let payload = match result {
                Ok(Message::Binary(data)) => Bytes::from(data),
                Ok(Message::Text(text)) => Bytes::from(text),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(_)) => {
                    debug!(user_id = %user_id, "Client initiated close");
                    break;
                }
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "WebSocket error");
                    break;
                }
            };

            if !rate_limiter.check() {
                debug!(user_id = %user_id, "Rate limited input message");
                continue;
            }
            registry.on_message(room_id, user_id, payload);
        }
    };

    tokio::select! {
        _ = reader => {}
        _ = &mut writer_handle => {
            debug!(room_id = %room_id, user_id = %user_id, "Snapshot stream ended");
        }
    }

    writer_handle.abort();
}

async fn forward_snapshots(
    room_id: String,
    user_id: String,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut snapshot_rx: broadcast::Receiver<Bytes>,
) {
    loop {
        match snapshot_rx.recv().await {
            Ok(payload) => {
                if let Err(e) = ws_sink.send(Message::Binary(payload.to_vec())).await {
                    debug!(user_id = %user_id, error = %e, "WebSocket send failed");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(user_id = %user_id, lagged_count = n, "Client lagged, skipping snapshots");
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!(room_id = %room_id, user_id = %user_id, "Room closed, ending session");
                let _ = ws_sink.send(Message::Close(None)).await;
                break;
            }
        }
    }
}
