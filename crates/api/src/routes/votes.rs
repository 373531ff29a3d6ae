use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::ApiError, state::AppState};

pub async fn list(State(state): State<AppState>) -> Result<Json<HashMap<String, u64>>, ApiError> {
    Ok(Json(state.votes.list()?))
}

pub async fn add(
    State(state): State<AppState>,
    Path(event_code): Path<String>,
) -> Result<Json<u64>, ApiError> {
    Ok(Json(state.votes.add_vote(&event_code)?))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(event_code): Path<String>,
) -> Result<Json<u64>, ApiError> {
    Ok(Json(state.votes.remove_vote(&event_code)?))
}
