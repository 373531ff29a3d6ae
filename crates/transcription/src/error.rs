#[derive(Debug, thiserror::Error)]
pub enum AsrError {
    #[error("ASR engine initialization failed: {0}")]
    Init(String),
    #[error("ASR engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ASR worker protocol error: {0}")]
    Protocol(String),
}
