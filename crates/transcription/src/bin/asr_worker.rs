use tokio::io::{stdin, stdout, AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

use transcast_transcription::protocol::{WorkerMessage, FRAME_TAG_AUDIO, FRAME_TAG_STOP};
use transcast_transcription::{AsrConfig, AsrEngine, SilentEngine};
#[cfg(feature = "local-whisper")]
use transcast_transcription::WhisperAsrEngine;

/// Thin per-room ASR harness. Reads length-prefixed audio frames on
/// stdin, forwards them to the engine, and writes newline-delimited JSON
/// hypotheses (plus a leading `Ready` sentinel) on stdout.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_json = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("missing ASR config argument"))?;
    let config: AsrConfig = serde_json::from_str(&config_json)?;

    let (audio_tx, audio_rx) = mpsc::channel::<Vec<u8>>(64);
    let (hyp_tx, mut hyp_rx) = mpsc::channel(64);

    #[cfg(feature = "local-whisper")]
    let mut engine: Box<dyn AsrEngine> = match WhisperAsrEngine::new(&config.model, config.clone()) {
        Ok(engine) => Box::new(engine),
        Err(err) => {
            emit(&WorkerMessage::Error {
                message: err.to_string(),
            })
            .await;
            Box::new(SilentEngine)
        }
    };
    #[cfg(not(feature = "local-whisper"))]
    let mut engine: Box<dyn AsrEngine> = {
        let _ = &config;
        Box::new(SilentEngine)
    };

    let engine_task = tokio::spawn(async move { engine.run(audio_rx, hyp_tx).await });

    emit(&WorkerMessage::Ready).await;

    let writer_task = tokio::spawn(async move {
        while let Some(chunk) = hyp_rx.recv().await {
            emit(&WorkerMessage::Hypothesis { chunk }).await;
        }
    });

    let mut input = stdin();
    loop {
        let mut tag = [0u8; 1];
        if input.read_exact(&mut tag).await.is_err() {
            break;
        }
        match tag[0] {
            FRAME_TAG_AUDIO => {
                let mut len_buf = [0u8; 4];
                if input.read_exact(&mut len_buf).await.is_err() {
                    break;
                }
                let len = u32::from_le_bytes(len_buf) as usize;
                let mut payload = vec![0u8; len];
                if input.read_exact(&mut payload).await.is_err() {
                    break;
                }
                if audio_tx.send(payload).await.is_err() {
                    break;
                }
            }
            FRAME_TAG_STOP => break,
            _ => break,
        }
    }
    drop(audio_tx);

    let _ = engine_task.await;
    let _ = writer_task.await;
    Ok(())
}

async fn emit(message: &WorkerMessage) {
    let Ok(line) = serde_json::to_string(message) else {
        return;
    };
    let mut out = stdout();
    let _ = out.write_all(line.as_bytes()).await;
    let _ = out.write_all(b"\n").await;
    let _ = out.flush().await;
}
