use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use transcast_reconciler::Reconciler;
use transcast_translation::TranslationWorker;

use crate::error::RoomsError;

/// Transport-agnostic representation of a websocket frame. The API layer
/// translates real websocket messages into these and back, keeping this
/// crate free of any dependency on a specific web framework.
#[derive(Debug, Clone)]
pub enum Frame {
    Binary(Vec<u8>),
    Text(String),
    /// A terminal close frame with a protocol close code and human reason,
    /// per spec.md's 1000/1003/1008 close-code contract.
    Close { code: u16, reason: String },
}

/// A single inbound item at the websocket boundary, replacing
/// exception-based disconnect handling with an explicit result channel.
#[derive(Debug)]
pub enum WsEvent {
    Message(Frame),
    Disconnect,
    Protocol(String),
}

/// Why a host session loop returned control to its caller.
#[derive(Debug, PartialEq, Eq)]
pub enum HostSessionEnd {
    Disconnected,
    RestartRequested,
}

#[derive(Debug, Deserialize)]
struct ControlSignal {
    signal: String,
}

struct HostConn {
    id: Uuid,
    tx: mpsc::Sender<Frame>,
    target_lang: String,
}

struct ClientConn {
    id: Uuid,
    tx: mpsc::Sender<Frame>,
    target_lang: String,
}

struct ConnectionState {
    host: Option<HostConn>,
    clients: Vec<ClientConn>,
}

/// One per active room. Bridges the room-worker's hypothesis stream into
/// the reconciler (owned by the room worker's consumer task) and the
/// reconciler's broadcast channel out to the host and every client.
pub struct ConnectionManager {
    state: Mutex<ConnectionState>,
    reconciler: RwLock<Arc<Reconciler>>,
    translation_worker: RwLock<Arc<TranslationWorker>>,
    broadcast_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(reconciler: Arc<Reconciler>, translation_worker: Arc<TranslationWorker>) -> Arc<Self> {
        let manager = Arc::new(Self {
            state: Mutex::new(ConnectionState {
                host: None,
                clients: Vec::new(),
            }),
            reconciler: RwLock::new(Arc::clone(&reconciler)),
            translation_worker: RwLock::new(translation_worker),
            broadcast_task: Mutex::new(None),
        });
        manager.clone().spawn_broadcast_bridge(reconciler);
        manager
    }

    async fn current_reconciler(&self) -> Arc<Reconciler> {
        self.reconciler.read().await.clone()
    }

    async fn current_translation_worker(&self) -> Arc<TranslationWorker> {
        self.translation_worker.read().await.clone()
    }

    /// Swaps in a freshly built reconciler and translation worker (e.g.
    /// after a host-driven source-language switch), replaying every
    /// currently-connected host/client subscription onto the new worker and
    /// restarting the broadcast bridge against the new reconciler.
    pub async fn rebind(
        self: &Arc<Self>,
        reconciler: Arc<Reconciler>,
        translation_worker: Arc<TranslationWorker>,
    ) {
        let subscribed_langs: Vec<String> = {
            let state = self.state.lock().await;
            let mut langs: Vec<String> = state.clients.iter().map(|c| c.target_lang.clone()).collect();
            if let Some(host) = &state.host {
                langs.push(host.target_lang.clone());
            }
            langs
        };
        for lang in &subscribed_langs {
            translation_worker.subscribe(lang);
        }

        *self.reconciler.write().await = Arc::clone(&reconciler);
        *self.translation_worker.write().await = translation_worker;

        if let Some(old) = self.broadcast_task.lock().await.take() {
            old.abort();
        }
        self.clone().spawn_broadcast_bridge(reconciler);
    }

    fn spawn_broadcast_bridge(self: Arc<Self>, reconciler: Arc<Reconciler>) {
        let mut rx = reconciler.subscribe();
        let task_self = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(chunk) => {
                        let Ok(payload) = serde_json::to_string(&chunk) else {
                            continue;
                        };
                        task_self.send_to_all(Frame::Text(payload)).await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            task_self
                .send_to_all(Frame::Text(r#"{"type":"ready_to_stop"}"#.to_string()))
                .await;
        });
        // stored so shutdown/rebind can abort it; the handle is otherwise fire-and-forget
        if let Ok(mut guard) = self.broadcast_task.try_lock() {
            *guard = Some(handle);
        }
    }

    async fn send_to_all(&self, frame: Frame) {
        let mut state = self.state.lock().await;
        if let Some(host) = &state.host {
            if host.tx.send(frame.clone()).await.is_err() {
                debug!("dropping host send after channel closed");
            }
        }
        let mut i = 0;
        while i < state.clients.len() {
            if state.clients[i].tx.send(frame.clone()).await.is_err() {
                state.clients.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Runs one host session: rejects a second concurrent host, subscribes
    /// `target_lang`, replays the last broadcast chunk, then dispatches
    /// incoming frames until disconnect or a restart signal.
    pub async fn listen_to_host(
        &self,
        host_tx: mpsc::Sender<Frame>,
        incoming: &mut mpsc::Receiver<WsEvent>,
        target_lang: String,
        audio_tx: mpsc::Sender<Vec<u8>>,
    ) -> Result<HostSessionEnd, RoomsError> {
        {
            let mut state = self.state.lock().await;
            if state.host.is_some() {
                return Err(RoomsError::HostAlreadyConnected);
            }
            let host_id = Uuid::new_v4();
            state.host = Some(HostConn {
                id: host_id,
                tx: host_tx.clone(),
                target_lang: target_lang.clone(),
            });
            self.current_translation_worker().await.subscribe(&target_lang);
            let _ = host_tx
                .send(Frame::Text(
                    serde_json::json!({ "host_id": host_id }).to_string(),
                ))
                .await;
        }

        if let Ok(Some(last)) = self.current_reconciler().await.last_chunk() {
            if let Ok(payload) = serde_json::to_string(&last) {
                let _ = host_tx.send(Frame::Text(payload)).await;
            }
        }

        let end = loop {
            match incoming.recv().await {
                Some(WsEvent::Message(Frame::Binary(bytes))) => {
                    let _ = audio_tx.send(bytes).await;
                }
                Some(WsEvent::Message(Frame::Text(text))) => {
                    if let Ok(signal) = serde_json::from_str::<ControlSignal>(&text) {
                        if signal.signal == "restart_backend_engine" {
                            break HostSessionEnd::RestartRequested;
                        }
                    }
                }
                Some(WsEvent::Disconnect) | None => break HostSessionEnd::Disconnected,
                Some(WsEvent::Protocol(reason)) => {
                    debug!(reason, "protocol error on host connection");
                    break HostSessionEnd::Disconnected;
                }
            }
        };

        let mut state = self.state.lock().await;
        if end != HostSessionEnd::RestartRequested {
            self.current_translation_worker().await.unsubscribe(&target_lang);
            state.host = None;
        }
        Ok(end)
    }

    pub async fn host_id(&self) -> Option<Uuid> {
        self.state.lock().await.host.as_ref().map(|h| h.id)
    }

    /// Appends `ws` to the client list and keeps it open until it
    /// disconnects, at which point it is removed and `target_lang` is
    /// unsubscribed.
    pub async fn connect_client(
        &self,
        client_tx: mpsc::Sender<Frame>,
        incoming: &mut mpsc::Receiver<WsEvent>,
        target_lang: String,
    ) {
        let client_id = Uuid::new_v4();
        {
            let mut state = self.state.lock().await;
            state.clients.push(ClientConn {
                id: client_id,
                tx: client_tx.clone(),
                target_lang: target_lang.clone(),
            });
        }
        self.current_translation_worker().await.subscribe(&target_lang);

        if let Ok(Some(last)) = self.current_reconciler().await.last_chunk() {
            if let Ok(payload) = serde_json::to_string(&last) {
                let _ = client_tx.send(Frame::Text(payload)).await;
            }
        }

        loop {
            match incoming.recv().await {
                Some(WsEvent::Disconnect) | None => break,
                Some(WsEvent::Protocol(_)) => break,
                Some(WsEvent::Message(_)) => {
                    // clients are read-only observers; inbound frames are ignored
                }
            }
        }

        self.current_translation_worker().await.unsubscribe(&target_lang);
        let mut state = self.state.lock().await;
        state.clients.retain(|c| c.id != client_id);
    }

    pub async fn has_host(&self) -> bool {
        self.state.lock().await.host.is_some()
    }

    /// Cancels the broadcast bridge task; called on room deactivation.
    pub async fn cancel(&self) {
        if let Some(task) = self.broadcast_task.lock().await.take() {
            task.abort();
        }
    }
}
