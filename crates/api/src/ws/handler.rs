use std::collections::HashMap;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use transcast_rooms::{Frame, HostSessionEnd, Power, WsEvent};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoomWsPath {
    pub room_id: String,
    pub role: String,
    pub source_lang: String,
    pub target_lang: String,
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    let Some(raw) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) else {
        return cookies;
    };
    for part in raw.split(';') {
        if let Some((key, value)) = part.trim().split_once('=') {
            cookies.insert(key.to_string(), value.to_string());
        }
    }
    cookies
}

pub async fn ws_upgrade(
    State(state): State<AppState>,
    Path(path): Path<RoomWsPath>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let cookies = parse_cookies(&headers);
    ws.on_upgrade(move |socket| handle_socket(socket, state, path, cookies))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    path: RoomWsPath,
    cookies: HashMap<String, String>,
) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Frame>(64);
    let (in_tx, mut in_rx) = mpsc::channel::<WsEvent>(64);

    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let msg = match frame {
                Frame::Text(text) => Message::Text(text.into()),
                Frame::Binary(bytes) => Message::Binary(bytes.into()),
                Frame::Close { code, reason } => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            };
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            let event = match msg {
                Ok(Message::Text(text)) => WsEvent::Message(Frame::Text(text.to_string())),
                Ok(Message::Binary(bytes)) => WsEvent::Message(Frame::Binary(bytes.to_vec())),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(_)) => WsEvent::Disconnect,
                Err(_) => WsEvent::Disconnect,
            };
            let disconnecting = matches!(event, WsEvent::Disconnect);
            if in_tx.send(event).await.is_err() || disconnecting {
                break;
            }
        }
    });

    match path.role.as_str() {
        "host" => handle_host(&state, &path, &cookies, out_tx.clone(), &mut in_rx).await,
        "client" => handle_client(&state, &path, out_tx.clone(), &mut in_rx).await,
        other => {
            let _ = out_tx
                .send(Frame::Close {
                    code: 1003,
                    reason: format!("unknown role: {other}"),
                })
                .await;
        }
    }

    writer.abort();
    reader.abort();
    info!(room = %path.room_id, role = %path.role, "websocket connection closed");
}

/// Host sessions require an `authenticated` cookie carrying a valid auth
/// key, plus two boolean cookies controlling transcript persistence and
/// public readability, per spec.md §6's websocket interface.
async fn handle_host(
    state: &AppState,
    path: &RoomWsPath,
    cookies: &HashMap<String, String>,
    out_tx: mpsc::Sender<Frame>,
    in_rx: &mut mpsc::Receiver<WsEvent>,
) {
    let Some(host_key) = cookies.get("authenticated").cloned() else {
        let _ = out_tx
            .send(Frame::Close {
                code: 1008,
                reason: "missing authenticated cookie".into(),
            })
            .await;
        return;
    };
    if !state.auth.validate(&host_key, Power::Host) {
        let _ = out_tx
            .send(Frame::Close {
                code: 1008,
                reason: "invalid or expired auth key".into(),
            })
            .await;
        return;
    }

    let save_transcript = cookies
        .get(&format!("{}-allow_store", path.room_id))
        .map(|v| v == "true")
        .unwrap_or(false);
    let public_transcript = cookies
        .get(&format!("{}-allow_client_download", path.room_id))
        .map(|v| v == "true")
        .unwrap_or(true);

    loop {
        let room = match state
            .rooms
            .activate_room_as_host(
                &path.room_id,
                &host_key,
                &path.source_lang,
                &path.target_lang,
                save_transcript,
                public_transcript,
            )
            .await
        {
            Ok(room) => room,
            Err(err) => {
                let _ = out_tx
                    .send(Frame::Close {
                        code: 1003,
                        reason: err.to_string(),
                    })
                    .await;
                return;
            }
        };
        let (Some(connection_manager), Some(audio_tx)) =
            (room.connection_manager().await, room.audio_tx().await)
        else {
            let _ = out_tx
                .send(Frame::Close {
                    code: 1003,
                    reason: "room has no active pipeline".into(),
                })
                .await;
            return;
        };

        let result = connection_manager
            .listen_to_host(out_tx.clone(), in_rx, path.target_lang.clone(), audio_tx)
            .await;

        match result {
            Ok(HostSessionEnd::RestartRequested) => {
                if let Err(err) = state.rooms.restart_room_engine(&path.room_id).await {
                    warn!(%err, room = %path.room_id, "failed to restart room engine");
                    let _ = out_tx
                        .send(Frame::Close {
                            code: 1003,
                            reason: "internal server error".into(),
                        })
                        .await;
                    return;
                }
                continue;
            }
            Ok(HostSessionEnd::Disconnected) => {
                state.rooms.defer_room_deactivation(path.room_id.clone());
                return;
            }
            Err(err) => {
                warn!(%err, room = %path.room_id, "host session rejected");
                let _ = out_tx
                    .send(Frame::Close {
                        code: 1003,
                        reason: err.to_string(),
                    })
                    .await;
                return;
            }
        }
    }
}

async fn handle_client(
    state: &AppState,
    path: &RoomWsPath,
    out_tx: mpsc::Sender<Frame>,
    in_rx: &mut mpsc::Receiver<WsEvent>,
) {
    let room = match state
        .rooms
        .join_room_as_client(&path.room_id, &path.target_lang)
        .await
    {
        Ok(room) => room,
        Err(err) => {
            let _ = out_tx
                .send(Frame::Close {
                    code: 1003,
                    reason: err.to_string(),
                })
                .await;
            return;
        }
    };
    let Some(connection_manager) = room.connection_manager().await else {
        let _ = out_tx
            .send(Frame::Close {
                code: 1003,
                reason: "room has no active pipeline".into(),
            })
            .await;
        return;
    };
    connection_manager
        .connect_client(out_tx, in_rx, path.target_lang.clone())
        .await;
}
