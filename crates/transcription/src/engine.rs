use async_trait::async_trait;
use tokio::sync::mpsc;
use transcast_reconciler::HypothesisChunk;

#[cfg(feature = "local-whisper")]
use crate::config::AsrConfig;
use crate::error::AsrError;

/// External-collaborator seam for speech recognition. An implementation
/// owns the model and any buffering; it runs until `audio_rx` closes.
#[async_trait]
pub trait AsrEngine: Send {
    async fn run(
        &mut self,
        audio_rx: mpsc::Receiver<Vec<u8>>,
        hypotheses_tx: mpsc::Sender<HypothesisChunk>,
    ) -> Result<(), AsrError>;
}

/// Engine that never produces a hypothesis; used by tests and by builds
/// without a local-whisper backend compiled in.
pub struct SilentEngine;

#[async_trait]
impl AsrEngine for SilentEngine {
    async fn run(
        &mut self,
        mut audio_rx: mpsc::Receiver<Vec<u8>>,
        _hypotheses_tx: mpsc::Sender<HypothesisChunk>,
    ) -> Result<(), AsrError> {
        while audio_rx.recv().await.is_some() {}
        Ok(())
    }
}

#[cfg(feature = "local-whisper")]
pub use whisper_engine::WhisperAsrEngine;

#[cfg(feature = "local-whisper")]
mod whisper_engine {
    use super::*;
    use transcast_reconciler::IncomingLine;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Buffers incoming PCM (16kHz mono f32 samples, little-endian bytes)
    /// and runs whisper.cpp over the accumulated window once it reaches
    /// `min_chunk_size` seconds, emitting one line per run.
    pub struct WhisperAsrEngine {
        ctx: WhisperContext,
        config: AsrConfig,
        pcm: Vec<f32>,
        line_idx: usize,
    }

    impl WhisperAsrEngine {
        pub fn new(model_path: &str, config: AsrConfig) -> Result<Self, AsrError> {
            let params = WhisperContextParameters::default();
            let ctx = WhisperContext::new_with_params(model_path, params)
                .map_err(|e| AsrError::Init(e.to_string()))?;
            Ok(Self {
                ctx,
                config,
                pcm: Vec::new(),
                line_idx: 0,
            })
        }

        fn min_samples(&self) -> usize {
            (self.config.min_chunk_size * 16_000.0) as usize
        }

        fn transcribe_buffer(&mut self) -> Result<Option<String>, AsrError> {
            let mut state = self
                .ctx
                .create_state()
                .map_err(|e| AsrError::Init(e.to_string()))?;
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_language(Some(&self.config.source_lang));
            params.set_print_progress(false);
            params.set_print_special(false);
            params.set_print_realtime(false);

            state
                .full(params, &self.pcm)
                .map_err(|e| AsrError::Init(e.to_string()))?;

            let segments = state
                .full_n_segments()
                .map_err(|e| AsrError::Init(e.to_string()))?;
            let mut text = String::new();
            for i in 0..segments {
                if let Ok(segment) = state.full_get_segment_text(i) {
                    text.push_str(&segment);
                }
            }
            self.pcm.clear();
            if text.trim().is_empty() {
                Ok(None)
            } else {
                Ok(Some(text))
            }
        }
    }

    #[async_trait]
    impl AsrEngine for WhisperAsrEngine {
        async fn run(
            &mut self,
            mut audio_rx: mpsc::Receiver<Vec<u8>>,
            hypotheses_tx: mpsc::Sender<HypothesisChunk>,
        ) -> Result<(), AsrError> {
            while let Some(bytes) = audio_rx.recv().await {
                let samples: Vec<f32> = bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                self.pcm.extend(samples);

                if self.pcm.len() < self.min_samples() {
                    continue;
                }

                if let Some(text) = self.transcribe_buffer()? {
                    let beg = self.line_idx as i64 * 0; // placeholder wall-clock offsets are tracked by the room worker
                    let chunk = HypothesisChunk {
                        buffer_transcription: String::new(),
                        lines: vec![IncomingLine {
                            beg: format!("00:00:{beg:02}"),
                            end: format!("00:00:{beg:02}"),
                            text,
                            speaker: -1,
                        }],
                        remaining_time_transcription: 0.0,
                    };
                    self.line_idx += 1;
                    if hypotheses_tx.send(chunk).await.is_err() {
                        break;
                    }
                }
            }
            Ok(())
        }
    }
}
