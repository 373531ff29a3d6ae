#[derive(Debug, thiserror::Error)]
pub enum MtError {
    #[error("machine translation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("machine translation service returned an unexpected payload")]
    BadResponse,
}
