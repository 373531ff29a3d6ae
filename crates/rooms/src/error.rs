/// Validation/capacity/admission failures surfaced at the websocket or
/// HTTP boundary as a close code plus reason, per the failure semantics
/// each component documents.
#[derive(Debug, thiserror::Error)]
pub enum RoomsError {
    #[error("room not found: {0}")]
    RoomNotFound(String),
    #[error("room is not active: {0}")]
    RoomInactive(String),
    #[error("a host is already connected to this room")]
    HostAlreadyConnected,
    #[error("room does not permit recording")]
    DoesNotPermitRecording,
    #[error("source language not supported: {0}")]
    UnsupportedSourceLang(String),
    #[error("target language not supported: {0}")]
    UnsupportedTargetLang(String),
    #[error("Maximum capacity reached ({0} active rooms)")]
    MaximumCapacity(usize),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<transcast_transcription::AsrError> for RoomsError {
    fn from(err: transcast_transcription::AsrError) -> Self {
        RoomsError::Internal(err.to_string())
    }
}
