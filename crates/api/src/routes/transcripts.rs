use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use transcast_rooms::Event;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct KeyedRequest {
    pub key: String,
}

pub async fn list(
    State(state): State<AppState>,
    Json(body): Json<KeyedRequest>,
) -> Json<Vec<Event>> {
    Json(
        state
            .rooms
            .transcripts()
            .accessible_room_ids(Some(body.key.as_str()), &state.schedule),
    )
}

pub async fn get(
    State(state): State<AppState>,
    Path((room_id, lang)): Path<(String, String)>,
    Json(body): Json<KeyedRequest>,
) -> Result<String, ApiError> {
    Ok(state
        .rooms
        .transcripts()
        .compile_transcript(Some(body.key.as_str()), &room_id, &lang)?)
}
