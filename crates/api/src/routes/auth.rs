use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use transcast_rooms::Power;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    power: Option<Power>,
}

/// Reports the current power granted to a key, with no minimum threshold
/// (unlike `/validate`, which checks against a `required` power).
pub async fn auth(State(state): State<AppState>, Json(body): Json<AuthRequest>) -> Response {
    match state.auth.power_of(&body.key) {
        Some(power) => (
            StatusCode::OK,
            Json(AuthResponse {
                status: "valid",
                power: Some(power),
            }),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(AuthResponse {
                status: "fail",
                power: None,
            }),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
    pub role: Option<Power>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub key: String,
    pub expire_hours: u64,
    pub power: Power,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let result = state.auth.login(&body.password, body.role)?;
    Ok(Json(LoginResponse {
        key: result.key,
        expire_hours: result.expire_hours,
        power: result.power,
    }))
}

fn default_required_power() -> Power {
    Power::Host
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub key: String,
    #[serde(default = "default_required_power")]
    pub required: Power,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

pub async fn validate(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Json<ValidateResponse> {
    Json(ValidateResponse {
        valid: state.auth.validate(&body.key, body.required),
    })
}
