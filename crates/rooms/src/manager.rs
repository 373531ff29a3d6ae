use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use transcast_config::Settings;
use transcast_translation::MtClient;

use crate::error::RoomsError;
use crate::room::{Room, RoomIdentity};
use crate::schedule::{Event, ScheduleProvider};
use crate::transcript::TranscriptStore;

/// A room's schedule metadata plus whether it currently has a live pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub id: String,
    pub title: String,
    pub track: String,
    pub location: String,
    pub presenter: String,
    pub active: bool,
    pub host_connection_id: Option<Uuid>,
}

/// Response body for `GET /room_list`: the fleet's static capabilities
/// alongside its currently-ongoing rooms.
#[derive(Debug, Clone, Serialize)]
pub struct RoomListResponse {
    pub available_source_langs: Vec<String>,
    pub available_target_langs: Vec<String>,
    pub max_active_rooms: usize,
    pub rooms: Vec<RoomSummary>,
}

fn identity_from_event(event: &Event) -> RoomIdentity {
    RoomIdentity {
        id: event.code.clone(),
        title: event.title.clone(),
        track: event.track.clone(),
        location: event.location.clone(),
        presenter: event.presenter.clone(),
        description: event.description.clone(),
        do_not_record: event.do_not_record,
    }
}

/// The fleet of rooms the process currently knows about. Rooms are created
/// lazily from schedule events on first host activation and capped at
/// `rooms.max_active_rooms` concurrently active pipelines.
pub struct RoomManager {
    rooms: DashMap<String, Arc<Room>>,
    active_count: AtomicUsize,
    schedule: Arc<ScheduleProvider>,
    transcripts: Arc<TranscriptStore>,
    settings: Settings,
    mt_client: Arc<dyn MtClient>,
    mt_supported_langs: Vec<String>,
}

impl RoomManager {
    pub fn new(
        settings: Settings,
        schedule: Arc<ScheduleProvider>,
        transcripts: Arc<TranscriptStore>,
        mt_client: Arc<dyn MtClient>,
        mt_supported_langs: Vec<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            rooms: DashMap::new(),
            active_count: AtomicUsize::new(0),
            schedule,
            transcripts,
            settings,
            mt_client,
            mt_supported_langs,
        })
    }

    /// Synthetic event for the always-available development/test room,
    /// mirroring `examples/original_source/src/room_manager.py`'s
    /// hardcoded `dev_room_id` entry: it is never sourced from the
    /// schedule and is always present alongside whatever is ongoing.
    fn dev_event(&self) -> Event {
        Event {
            code: self.settings.schedule.dev_room_id.clone(),
            title: "Development Room".into(),
            track: "dev".into(),
            location: "local".into(),
            start: Utc::now(),
            duration_minutes: 24 * 60,
            presenter: "dev".into(),
            description: "Always-available room for local development and testing.".into(),
            do_not_record: false,
        }
    }

    fn resolve_event(&self, room_id: &str) -> Result<Event, RoomsError> {
        if room_id == self.settings.schedule.dev_room_id {
            return Ok(self.dev_event());
        }
        self.schedule
            .get_event_by_id(room_id)
            .map_err(|_| RoomsError::RoomNotFound(room_id.to_string()))
    }

    pub async fn get_room_list(&self) -> RoomListResponse {
        let mut rooms = Vec::new();
        let mut events = self.schedule.get_ongoing_events();
        if !events
            .iter()
            .any(|e| e.code == self.settings.schedule.dev_room_id)
        {
            events.push(self.dev_event());
        }
        for event in events {
            let room = self.rooms.get(&event.code).map(|r| r.value().clone());
            let (active, host_connection_id) = match &room {
                Some(room) if room.is_active().await => {
                    let host_connection_id = match room.connection_manager().await {
                        Some(cm) => cm.host_id().await,
                        None => None,
                    };
                    (true, host_connection_id)
                }
                _ => (false, None),
            };
            rooms.push(RoomSummary {
                id: event.code,
                title: event.title,
                track: event.track,
                location: event.location,
                presenter: event.presenter,
                active,
                host_connection_id,
            });
        }

        RoomListResponse {
            available_source_langs: self.settings.asr.supported_langs.clone(),
            available_target_langs: self.mt_supported_langs.clone(),
            max_active_rooms: self.settings.rooms.max_active_rooms,
            rooms,
        }
    }

    fn room_for_event(&self, event: &Event) -> Arc<Room> {
        self.rooms
            .entry(event.code.clone())
            .or_insert_with(|| Arc::new(Room::new(identity_from_event(event))))
            .clone()
    }

    fn validate_source_lang(&self, lang: &str) -> Result<(), RoomsError> {
        if self.settings.asr.supported_langs.iter().any(|l| l == lang) {
            Ok(())
        } else {
            Err(RoomsError::UnsupportedSourceLang(lang.to_string()))
        }
    }

    fn validate_target_lang(&self, lang: &str) -> Result<(), RoomsError> {
        if self.mt_supported_langs.iter().any(|l| l == lang) {
            Ok(())
        } else {
            Err(RoomsError::UnsupportedTargetLang(lang.to_string()))
        }
    }

    /// Activates (or takes over, or retunes) the room for `room_id` as its
    /// host. Fails if the event does not permit recording, either language
    /// is unsupported, or the room fleet is at capacity.
    ///
    /// If the room is already active with a matching source language, the
    /// new host simply takes over the audio path and any pending deferred
    /// deactivation is cancelled. If the source language differs, the
    /// engine is restarted in place. Otherwise, a fresh activation is
    /// admitted against the active-room cap.
    #[allow(clippy::too_many_arguments)]
    pub async fn activate_room_as_host(
        &self,
        room_id: &str,
        host_key: &str,
        source_lang: &str,
        target_lang: &str,
        save_transcript: bool,
        public_transcript: bool,
    ) -> Result<Arc<Room>, RoomsError> {
        let event = self.resolve_event(room_id)?;
        if event.do_not_record {
            return Err(RoomsError::DoesNotPermitRecording);
        }
        self.validate_source_lang(source_lang)?;
        self.validate_target_lang(target_lang)?;

        let room = self.room_for_event(&event);
        if room.is_active().await {
            let current_source = room.source_lang().await.unwrap_or_default();
            if current_source == source_lang {
                room.cancel_deferred_deactivation().await;
                return Ok(room);
            }
            room.switch_source_lang(
                source_lang.to_string(),
                &self.settings,
                Arc::clone(&self.mt_client),
                &self.transcripts,
                save_transcript,
                public_transcript,
                host_key,
            )
            .await?;
            return Ok(room);
        }

        if self.active_count.load(Ordering::SeqCst) >= self.settings.rooms.max_active_rooms {
            return Err(RoomsError::MaximumCapacity(self.settings.rooms.max_active_rooms));
        }
        self.active_count.fetch_add(1, Ordering::SeqCst);

        if let Err(err) = room
            .activate(
                source_lang.to_string(),
                &self.settings,
                Arc::clone(&self.mt_client),
                &self.transcripts,
                save_transcript,
                public_transcript,
                host_key,
            )
            .await
        {
            self.active_count.fetch_sub(1, Ordering::SeqCst);
            return Err(err);
        }
        Ok(room)
    }

    /// Joins an already-active room as a listening client in `target_lang`.
    pub async fn join_room_as_client(
        &self,
        room_id: &str,
        target_lang: &str,
    ) -> Result<Arc<Room>, RoomsError> {
        self.validate_target_lang(target_lang)?;

        let room = self
            .rooms
            .get(room_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RoomsError::RoomNotFound(room_id.to_string()))?;
        if !room.is_active().await {
            return Err(RoomsError::RoomInactive(room_id.to_string()));
        }
        Ok(room)
    }

    /// Replaces a room's ASR worker process in place, keeping its
    /// reconciler history and connections intact.
    pub async fn restart_room_engine(&self, room_id: &str) -> Result<(), RoomsError> {
        let room = self
            .rooms
            .get(room_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RoomsError::RoomNotFound(room_id.to_string()))?;
        room.restart_engine(&self.settings).await
    }

    pub async fn deactivate_room(&self, room_id: &str) -> Result<(), RoomsError> {
        let room = self
            .rooms
            .get(room_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RoomsError::RoomNotFound(room_id.to_string()))?;
        if room.is_active().await {
            room.deactivate().await;
            self.active_count.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Schedules the room to deactivate after `idle_close_secs` unless a
    /// new host reconnects and cancels the timer first.
    pub fn defer_room_deactivation(self: &Arc<Self>, room_id: String) {
        let manager = Arc::clone(self);
        let Some(room) = self.rooms.get(&room_id).map(|r| r.value().clone()) else {
            return;
        };
        let delay = Duration::from_secs(self.settings.rooms.idle_close_secs);
        tokio::spawn(async move {
            room.defer_deactivation(delay, move || async move {
                let _ = manager.deactivate_room(&room_id).await;
            })
            .await;
        });
    }

    pub fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
