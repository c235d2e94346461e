use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::models::RoomRecord;
use super::resolver::RoomIdResolver;
use super::session::ChatSession;
use crate::shared::{AppError, AppState};

/// Request body for room creation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub user_a: String,
    pub user_b: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: String,
    pub user_a: String,
    pub user_b: String,
    pub created_at: DateTime<Utc>,
}

impl From<RoomRecord> for RoomSummary {
    fn from(record: RoomRecord) -> Self {
        Self {
            room_id: record.room_id,
            user_a: record.user_a,
            user_b: record.user_b,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomSummary>,
}

/// HTTP handler for deriving and creating a room
///
/// POST /rooms
/// Returns the same room ID for either argument order; the client opens
/// its chat stream against this ID afterwards.
#[instrument(name = "create_room", skip(state))]
pub async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, AppError> {
    let resolver = RoomIdResolver::new(Arc::clone(&state.repository));
    let room_id = resolver
        .derive_room_id(&request.user_a, &request.user_b)
        .await?;

    info!(room_id = %room_id, "Room resolved");
    Ok(Json(CreateRoomResponse { room_id }))
}

/// HTTP handler listing the rooms a user participates in
///
/// GET /users/{username}/rooms
#[instrument(name = "list_user_rooms", skip(state))]
pub async fn list_user_rooms(
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RoomListResponse>, AppError> {
    if !state.repository.user_exists(&username).await? {
        return Err(AppError::NotFound(format!("user not found: {}", username)));
    }

    let rooms = state.repository.list_rooms_for_user(&username).await?;
    info!(username = %username, count = rooms.len(), "Rooms listed");

    Ok(Json(RoomListResponse {
        rooms: rooms.into_iter().map(RoomSummary::from).collect(),
    }))
}

/// WebSocket upgrade handler
///
/// GET /ws
/// Upgrades the connection and hands it to a chat session; the first frame
/// the client sends is the handshake.
#[instrument(name = "chat_socket_handler", skip(state, ws))]
pub async fn chat_socket_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| async move {
        let session = ChatSession::new(Arc::clone(&state.repository), Arc::clone(&state.registry));
        if let Err(e) = session.run(Box::new(socket)).await {
            warn!(error = %e, "Chat session rejected");
        }
    })
}
