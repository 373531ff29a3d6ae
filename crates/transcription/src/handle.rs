use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use transcast_reconciler::HypothesisChunk;

use crate::config::AsrConfig;
use crate::error::AsrError;
use crate::protocol::{WorkerMessage, FRAME_TAG_AUDIO, FRAME_TAG_STOP};

const STOP_JOIN_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Running,
    Stopped,
    Failed,
}

/// Parent-side supervisor for one room's ASR child process. Isolates
/// model crashes, GPU memory, and slow init from the main process.
pub struct RoomWorkerHandle {
    child: Mutex<Option<Child>>,
    state: Mutex<WorkerState>,
    stdin_tx: mpsc::Sender<Vec<u8>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl RoomWorkerHandle {
    /// Spawns `worker_bin` with the room's ASR configuration as its sole
    /// argument, wires up the length-prefixed stdin / line-delimited
    /// stdout IPC, and resolves `ready_tx` once the child emits `Ready`.
    pub async fn spawn(
        worker_bin: &str,
        config: AsrConfig,
        hypotheses_tx: mpsc::Sender<HypothesisChunk>,
        ready_tx: oneshot::Sender<()>,
    ) -> Result<Self, AsrError> {
        let config_json =
            serde_json::to_string(&config).map_err(|e| AsrError::Protocol(e.to_string()))?;

        let mut child = Command::new(worker_bin)
            .arg(config_json)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AsrError::Init("missing child stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AsrError::Init("missing child stdout".into()))?;

        let (stdin_tx, mut stdin_rx) = mpsc::channel::<Vec<u8>>(64);
        tokio::spawn(async move {
            while let Some(payload) = stdin_rx.recv().await {
                if payload.is_empty() {
                    let _ = stdin.write_all(&[FRAME_TAG_STOP]).await;
                    let _ = stdin.shutdown().await;
                    break;
                }
                let mut frame = Vec::with_capacity(5 + payload.len());
                frame.push(FRAME_TAG_AUDIO);
                frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
                frame.extend_from_slice(&payload);
                if stdin.write_all(&frame).await.is_err() {
                    break;
                }
            }
        });

        let mut ready_tx = Some(ready_tx);
        let reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match serde_json::from_str::<WorkerMessage>(&line) {
                        Ok(WorkerMessage::Ready) => {
                            if let Some(tx) = ready_tx.take() {
                                let _ = tx.send(());
                            }
                        }
                        Ok(WorkerMessage::Hypothesis { chunk }) => {
                            if hypotheses_tx.send(chunk).await.is_err() {
                                break;
                            }
                        }
                        Ok(WorkerMessage::Error { message }) => {
                            error!(message, "ASR worker reported an error");
                        }
                        Err(err) => warn!(%err, line, "malformed ASR worker message"),
                    },
                    Ok(None) => break,
                    Err(err) => {
                        error!(%err, "ASR worker stdout read failed");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            child: Mutex::new(Some(child)),
            state: Mutex::new(WorkerState::Starting),
            stdin_tx,
            reader_task: Mutex::new(Some(reader_task)),
        })
    }

    pub async fn mark_running(&self) {
        *self.state.lock().await = WorkerState::Running;
    }

    pub async fn submit_audio(&self, pcm: Vec<u8>) -> Result<(), AsrError> {
        self.stdin_tx
            .send(pcm)
            .await
            .map_err(|_| AsrError::Protocol("worker stdin channel closed".into()))
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.lock().await
    }

    /// Enqueues `STOP`, then joins the child with a 10-second deadline.
    /// The parent is never allowed to deadlock on a hung worker: past the
    /// deadline it logs and proceeds, leaving the OS to reap the process.
    pub async fn shutdown(&self) {
        let _ = self.stdin_tx.send(Vec::new()).await;

        if let Some(mut child) = self.child.lock().await.take() {
            match tokio::time::timeout(STOP_JOIN_DEADLINE, child.wait()).await {
                Ok(Ok(status)) => info!(?status, "ASR worker exited"),
                Ok(Err(err)) => error!(%err, "ASR worker wait failed"),
                Err(_) => warn!("ASR worker did not exit within the shutdown deadline"),
            }
        }

        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        *self.state.lock().await = WorkerState::Stopped;
    }
}
