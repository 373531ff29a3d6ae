use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use transcast_rooms::{Power, RoomListResponse};

use crate::{error::ApiError, state::AppState};

pub async fn room_list(State(state): State<AppState>) -> Json<RoomListResponse> {
    Json(state.rooms.get_room_list().await)
}

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    pub key: String,
}

/// Force-closes an active room. Requires admin power.
pub async fn close(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<CloseRequest>,
) -> Result<(), ApiError> {
    if !state.auth.validate(&body.key, Power::Admin) {
        return Err(ApiError::Forbidden("insufficient power".into()));
    }
    state.rooms.deactivate_room(&room_id).await?;
    Ok(())
}
