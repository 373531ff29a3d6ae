use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use transcast_rooms::{AuthError, RoomsError, ScheduleError, TranscriptError, VoteError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<RoomsError> for ApiError {
    fn from(err: RoomsError) -> Self {
        match err {
            RoomsError::RoomNotFound(_) => ApiError::NotFound(err.to_string()),
            RoomsError::RoomInactive(_) => ApiError::Conflict(err.to_string()),
            RoomsError::HostAlreadyConnected => ApiError::Conflict(err.to_string()),
            RoomsError::DoesNotPermitRecording => ApiError::Forbidden(err.to_string()),
            RoomsError::UnsupportedSourceLang(_) | RoomsError::UnsupportedTargetLang(_) => {
                ApiError::BadRequest(err.to_string())
            }
            RoomsError::MaximumCapacity(_) => ApiError::Conflict(err.to_string()),
            RoomsError::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidPassword => ApiError::Unauthorized(err.to_string()),
            AuthError::InsufficientPower => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<VoteError> for ApiError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::UnknownEvent(_) => ApiError::NotFound(err.to_string()),
            VoteError::AlreadyZero => ApiError::Conflict(err.to_string()),
            VoteError::Io(_) | VoteError::Serde(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<TranscriptError> for ApiError {
    fn from(err: TranscriptError) -> Self {
        match err {
            TranscriptError::AccessDenied(_) => ApiError::Forbidden(err.to_string()),
            TranscriptError::NoSessions(_) => ApiError::NotFound(err.to_string()),
            TranscriptError::Io(_) | TranscriptError::Serde(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::EventNotFound(_) => ApiError::NotFound(err.to_string()),
            ScheduleError::Transport(_) => ApiError::Internal(err.to_string()),
        }
    }
}
