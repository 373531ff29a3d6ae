use serde::{Deserialize, Serialize};

/// Configuration passed to a freshly spawned room worker process; mirrors
/// the fields the ASR engine is instantiated with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrConfig {
    pub room_id: String,
    pub source_lang: String,
    pub model: String,
    pub device: String,
    pub compute_type: String,
    pub diarization: bool,
    pub vac: bool,
    pub buffer_trimming: String,
    pub min_chunk_size: f64,
    pub vac_chunk_size: f64,
}
