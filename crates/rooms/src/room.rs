use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use transcast_config::Settings;
use transcast_reconciler::Reconciler;
use transcast_transcription::{AsrConfig, RoomWorkerHandle};
use transcast_translation::{MtClient, TranslationWorker};

use crate::connection::ConnectionManager;
use crate::error::RoomsError;
use crate::transcript::TranscriptStore;

const WORKER_READY_DEADLINE: Duration = Duration::from_secs(30);

/// Fixed, schedule-derived fields that never change across a room's
/// activate/deactivate cycles.
#[derive(Debug, Clone)]
pub struct RoomIdentity {
    pub id: String,
    pub title: String,
    pub track: String,
    pub location: String,
    pub presenter: String,
    pub description: String,
    pub do_not_record: bool,
}

struct RoomRuntime {
    source_lang: Option<String>,
    reconciler: Option<Arc<Reconciler>>,
    translation_worker: Option<Arc<TranslationWorker>>,
    translation_task: Option<JoinHandle<()>>,
    room_worker: Option<Arc<RoomWorkerHandle>>,
    hypotheses_task: Option<JoinHandle<()>>,
    audio_forward_task: Option<JoinHandle<()>>,
    audio_tx: Option<mpsc::Sender<Vec<u8>>>,
    connection_manager: Option<Arc<ConnectionManager>>,
    deactivation_cancel: Option<oneshot::Sender<()>>,
}

impl RoomRuntime {
    fn empty() -> Self {
        Self {
            source_lang: None,
            reconciler: None,
            translation_worker: None,
            translation_task: None,
            room_worker: None,
            hypotheses_task: None,
            audio_forward_task: None,
            audio_tx: None,
            connection_manager: None,
            deactivation_cancel: None,
        }
    }
}

/// One conference room's live-captioning pipeline: an isolated ASR child
/// process feeding a reconciler, a translation worker polling it, and a
/// connection manager bridging both out to websocket listeners.
pub struct Room {
    pub identity: RoomIdentity,
    runtime: Mutex<RoomRuntime>,
}

impl Room {
    pub fn new(identity: RoomIdentity) -> Self {
        Self {
            identity,
            runtime: Mutex::new(RoomRuntime::empty()),
        }
    }

    pub async fn is_active(&self) -> bool {
        self.runtime.lock().await.reconciler.is_some()
    }

    pub async fn source_lang(&self) -> Option<String> {
        self.runtime.lock().await.source_lang.clone()
    }

    pub async fn reconciler(&self) -> Option<Arc<Reconciler>> {
        self.runtime.lock().await.reconciler.clone()
    }

    pub async fn connection_manager(&self) -> Option<Arc<ConnectionManager>> {
        self.runtime.lock().await.connection_manager.clone()
    }

    pub async fn audio_tx(&self) -> Option<mpsc::Sender<Vec<u8>>> {
        self.runtime.lock().await.audio_tx.clone()
    }

    /// Spins up the room's ASR worker, reconciler, translation worker, and
    /// connection manager. A no-op if the room is already active.
    pub async fn activate(
        &self,
        source_lang: String,
        settings: &Settings,
        mt: Arc<dyn MtClient>,
        transcript_store: &TranscriptStore,
        save_transcript: bool,
        public_transcript: bool,
        host_key: &str,
    ) -> Result<(), RoomsError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.reconciler.is_some() {
            return Ok(());
        }

        let reconciler = Arc::new(self.build_reconciler(
            &source_lang,
            settings,
            transcript_store,
            save_transcript,
            public_transcript,
            host_key,
        )?);
        let (room_worker, hypotheses_task) =
            self.spawn_worker(&source_lang, settings, Arc::clone(&reconciler)).await?;

        let translation_worker = Arc::new(TranslationWorker::new(
            Arc::clone(&reconciler),
            mt,
            Duration::from_secs_f64(settings.translation.poll_interval_secs),
            settings.translation.max_batch_per_cycle,
        ));
        let translation_task = translation_worker.spawn();

        let connection_manager =
            ConnectionManager::new(Arc::clone(&reconciler), Arc::clone(&translation_worker));

        let (audio_tx, audio_forward_task) = self.spawn_audio_forwarder(Arc::clone(&room_worker));

        runtime.source_lang = Some(source_lang);
        runtime.reconciler = Some(reconciler);
        runtime.translation_worker = Some(translation_worker);
        runtime.translation_task = Some(translation_task);
        runtime.room_worker = Some(room_worker);
        runtime.hypotheses_task = Some(hypotheses_task);
        runtime.audio_forward_task = Some(audio_forward_task);
        runtime.audio_tx = Some(audio_tx);
        runtime.connection_manager = Some(connection_manager);
        Ok(())
    }

    fn build_reconciler(
        &self,
        source_lang: &str,
        settings: &Settings,
        transcript_store: &TranscriptStore,
        save_transcript: bool,
        public_transcript: bool,
        host_key: &str,
    ) -> Result<Reconciler, RoomsError> {
        if !public_transcript {
            transcript_store
                .restrict_access(&self.identity.id, host_key)
                .map_err(|err| RoomsError::Internal(err.to_string()))?;
        }

        let mut reconciler = Reconciler::with_options(
            source_lang,
            settings.rooms.compare_depth,
            settings.rooms.broadcast_sentences,
        );
        if save_transcript {
            let writer = transcript_store.session_writer(&self.identity.id, Utc::now());
            let source_lang = source_lang.to_string();
            reconciler = reconciler.with_persistence(Box::new(move |lines| {
                if let Err(err) = writer.overwrite(&source_lang, lines) {
                    error!(%err, "failed to persist transcript snapshot");
                }
            }));
        }
        Ok(reconciler)
    }

    async fn spawn_worker(
        &self,
        source_lang: &str,
        settings: &Settings,
        reconciler: Arc<Reconciler>,
    ) -> Result<(Arc<RoomWorkerHandle>, JoinHandle<()>), RoomsError> {
        let config = AsrConfig {
            room_id: self.identity.id.clone(),
            source_lang: source_lang.to_string(),
            model: settings.asr.model.clone(),
            device: settings.asr.device.clone(),
            compute_type: settings.asr.compute_type.clone(),
            diarization: settings.asr.diarization,
            vac: settings.asr.vac,
            buffer_trimming: settings.asr.buffer_trimming.clone(),
            min_chunk_size: settings.asr.min_chunk_size,
            vac_chunk_size: settings.asr.vac_chunk_size,
        };

        let (hyp_tx, mut hyp_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();
        let worker = Arc::new(
            RoomWorkerHandle::spawn(&settings.asr.worker_bin, config, hyp_tx, ready_tx).await?,
        );

        tokio::time::timeout(WORKER_READY_DEADLINE, ready_rx)
            .await
            .map_err(|_| RoomsError::Internal("asr worker did not become ready in time".into()))?
            .map_err(|_| RoomsError::Internal("asr worker dropped its ready signal".into()))?;
        worker.mark_running().await;

        let hypotheses_task = tokio::spawn(async move {
            while let Some(chunk) = hyp_rx.recv().await {
                if let Err(err) = reconciler.submit_hypothesis(chunk) {
                    warn!(%err, "failed to reconcile ASR hypothesis");
                }
            }
        });

        Ok((worker, hypotheses_task))
    }

    fn spawn_audio_forwarder(
        &self,
        worker: Arc<RoomWorkerHandle>,
    ) -> (mpsc::Sender<Vec<u8>>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(256);
        let task = tokio::spawn(async move {
            while let Some(pcm) = rx.recv().await {
                if let Err(err) = worker.submit_audio(pcm).await {
                    warn!(%err, "failed to forward audio to ASR worker");
                    break;
                }
            }
        });
        (tx, task)
    }

    /// Tears down the ASR worker, translation worker, and connection
    /// manager. Idempotent.
    pub async fn deactivate(&self) {
        let mut runtime = self.runtime.lock().await;

        if let Some(cancel) = runtime.deactivation_cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(worker) = runtime.translation_worker.take() {
            worker.stop();
        }
        if let Some(task) = runtime.translation_task.take() {
            task.abort();
        }
        if let Some(manager) = runtime.connection_manager.take() {
            manager.cancel().await;
        }
        if let Some(worker) = runtime.room_worker.take() {
            worker.shutdown().await;
        }
        if let Some(task) = runtime.hypotheses_task.take() {
            task.abort();
        }
        if let Some(task) = runtime.audio_forward_task.take() {
            task.abort();
        }
        runtime.audio_tx = None;
        runtime.reconciler = None;
        runtime.source_lang = None;
    }

    /// Cancels a pending deferred-deactivation timer, if one is scheduled.
    /// A host reconnecting to an already-active room calls this instead of
    /// waiting for the idle-close timeout to lapse.
    pub async fn cancel_deferred_deactivation(&self) {
        let mut runtime = self.runtime.lock().await;
        if let Some(cancel) = runtime.deactivation_cancel.take() {
            let _ = cancel.send(());
        }
    }

    /// Rebuilds the reconciler, translation worker, and ASR worker for a
    /// new source language, reusing the existing connection manager so the
    /// host and client websockets survive the switch.
    pub async fn switch_source_lang(
        &self,
        source_lang: String,
        settings: &Settings,
        mt: Arc<dyn MtClient>,
        transcript_store: &TranscriptStore,
        save_transcript: bool,
        public_transcript: bool,
        host_key: &str,
    ) -> Result<(), RoomsError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.reconciler.is_none() {
            return Err(RoomsError::RoomInactive(self.identity.id.clone()));
        }
        if let Some(cancel) = runtime.deactivation_cancel.take() {
            let _ = cancel.send(());
        }

        if let Some(worker) = runtime.translation_worker.take() {
            worker.stop();
        }
        if let Some(task) = runtime.translation_task.take() {
            task.abort();
        }
        if let Some(worker) = runtime.room_worker.take() {
            worker.shutdown().await;
        }
        if let Some(task) = runtime.hypotheses_task.take() {
            task.abort();
        }
        if let Some(task) = runtime.audio_forward_task.take() {
            task.abort();
        }

        let reconciler = Arc::new(self.build_reconciler(
            &source_lang,
            settings,
            transcript_store,
            save_transcript,
            public_transcript,
            host_key,
        )?);
        let (room_worker, hypotheses_task) =
            self.spawn_worker(&source_lang, settings, Arc::clone(&reconciler)).await?;
        let translation_worker = Arc::new(TranslationWorker::new(
            Arc::clone(&reconciler),
            mt,
            Duration::from_secs_f64(settings.translation.poll_interval_secs),
            settings.translation.max_batch_per_cycle,
        ));
        let translation_task = translation_worker.spawn();
        let (audio_tx, audio_forward_task) = self.spawn_audio_forwarder(Arc::clone(&room_worker));

        if let Some(manager) = &runtime.connection_manager {
            manager
                .rebind(Arc::clone(&reconciler), Arc::clone(&translation_worker))
                .await;
        }

        runtime.source_lang = Some(source_lang);
        runtime.reconciler = Some(reconciler);
        runtime.translation_worker = Some(translation_worker);
        runtime.translation_task = Some(translation_task);
        runtime.room_worker = Some(room_worker);
        runtime.hypotheses_task = Some(hypotheses_task);
        runtime.audio_forward_task = Some(audio_forward_task);
        runtime.audio_tx = Some(audio_tx);
        Ok(())
    }

    /// Replaces a crashed or stale ASR worker with a fresh process while
    /// keeping the same reconciler, translation worker, and connections
    /// alive, so history and subscriptions survive the restart.
    pub async fn restart_engine(
        &self,
        settings: &Settings,
    ) -> Result<(), RoomsError> {
        let mut runtime = self.runtime.lock().await;
        let Some(reconciler) = runtime.reconciler.clone() else {
            return Err(RoomsError::RoomInactive(self.identity.id.clone()));
        };
        let source_lang = runtime
            .source_lang
            .clone()
            .unwrap_or_else(|| reconciler.source_lang().to_string());

        if let Some(worker) = runtime.room_worker.take() {
            worker.shutdown().await;
        }
        if let Some(task) = runtime.hypotheses_task.take() {
            task.abort();
        }
        if let Some(task) = runtime.audio_forward_task.take() {
            task.abort();
        }

        let (worker, hypotheses_task) = self
            .spawn_worker(&source_lang, settings, Arc::clone(&reconciler))
            .await?;
        let (audio_tx, audio_forward_task) = self.spawn_audio_forwarder(Arc::clone(&worker));

        runtime.room_worker = Some(worker);
        runtime.hypotheses_task = Some(hypotheses_task);
        runtime.audio_forward_task = Some(audio_forward_task);
        runtime.audio_tx = Some(audio_tx);
        Ok(())
    }

    /// Schedules `on_deactivate` to run after `delay`, replacing any
    /// previously scheduled deactivation. Any subsequent call (or
    /// `deactivate`) cancels the pending timer instead of letting two
    /// fire concurrently.
    pub async fn defer_deactivation<F, Fut>(&self, delay: Duration, on_deactivate: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut runtime = self.runtime.lock().await;
        if let Some(previous) = runtime.deactivation_cancel.take() {
            let _ = previous.send(());
        }
        let (cancel_tx, cancel_rx) = oneshot::channel();
        runtime.deactivation_cancel = Some(cancel_tx);

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => on_deactivate().await,
                _ = cancel_rx => {}
            }
        });
    }
}
