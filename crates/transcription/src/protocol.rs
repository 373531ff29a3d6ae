use serde::{Deserialize, Serialize};
use transcast_reconciler::HypothesisChunk;

/// Messages the child ASR worker writes to stdout, one JSON object per line.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Emitted once the engine has warmed up and is ready to receive audio.
    Ready,
    Hypothesis { chunk: HypothesisChunk },
    Error { message: String },
}

/// Frame tag written by the parent before each stdin payload.
pub const FRAME_TAG_AUDIO: u8 = 1;
/// Sentinel frame telling the child to finish cleanly; never followed by a payload.
pub const FRAME_TAG_STOP: u8 = 2;
