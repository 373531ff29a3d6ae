mod config;
mod engine;
mod error;
mod handle;
pub mod protocol;

pub use config::AsrConfig;
pub use engine::{AsrEngine, SilentEngine};
#[cfg(feature = "local-whisper")]
pub use engine::WhisperAsrEngine;
pub use error::AsrError;
pub use handle::{RoomWorkerHandle, WorkerState};
