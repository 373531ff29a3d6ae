use std::sync::Arc;

use chrono::Utc;
use transcast_config::{
    AppSettings, AsrSettings, AuthSettings, RoomSettings, ScheduleSettings, Settings,
    StorageSettings, TranslationSettings,
};
use transcast_rooms::{Event, RoomManager, RoomsError, ScheduleProvider, TranscriptStore};

use crate::fixtures::fake_mt::FakeMtClient;

fn manager(settings: Settings) -> (Arc<RoomManager>, Arc<ScheduleProvider>) {
    let schedule = Arc::new(ScheduleProvider::new(
        "http://unused.invalid/schedule.json".into(),
        5,
        None,
    ));
    let transcripts = Arc::new(TranscriptStore::new(
        tempfile::tempdir().unwrap().into_path(),
        "access.conf",
    ));
    let mt_client = Arc::new(FakeMtClient::new(["en", "de"]));
    let manager = RoomManager::new(
        settings,
        Arc::clone(&schedule),
        transcripts,
        mt_client,
        vec!["en".into(), "de".into()],
    );
    (manager, schedule)
}

fn event(code: &str) -> Event {
    Event {
        code: code.into(),
        title: "Test Talk".into(),
        track: "main".into(),
        location: "hall".into(),
        start: Utc::now(),
        duration_minutes: 60,
        presenter: "someone".into(),
        description: String::new(),
        do_not_record: false,
    }
}

fn settings() -> Settings {
    Settings {
        app: AppSettings {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
        },
        auth: AuthSettings {
            host_password: "host-pw".into(),
            admin_password: "admin-pw".into(),
            key_ttl_hours: 3,
        },
        schedule: ScheduleSettings {
            url: "http://unused.invalid/schedule.json".into(),
            cache_minutes: 5,
            dev_room_id: "dev".into(),
            fake_now: None,
        },
        asr: AsrSettings {
            supported_langs: vec!["en".into(), "de".into()],
            model: "base".into(),
            device: "cpu".into(),
            compute_type: "int8".into(),
            diarization: false,
            vac: true,
            buffer_trimming: "segment".into(),
            min_chunk_size: 1.0,
            vac_chunk_size: 0.04,
            worker_bin: "transcast-asr-worker".into(),
        },
        translation: TranslationSettings {
            mt_host: "127.0.0.1".into(),
            mt_port: 5500,
            supported_langs_endpoint: "/languages".into(),
            poll_interval_secs: 1.0,
            max_batch_per_cycle: 4,
        },
        rooms: RoomSettings {
            max_active_rooms: 1,
            idle_close_secs: 300,
            compare_depth: 10,
            broadcast_sentences: 20,
        },
        storage: StorageSettings {
            transcript_root: "transcripts_db".into(),
            votes_dir: "votes_db".into(),
            access_conf_name: "access.conf".into(),
        },
    }
}

#[tokio::test]
async fn empty_schedule_yields_only_the_dev_room() {
    let (manager, _schedule) = manager(settings());
    let rooms = manager.get_room_list().await.rooms;
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].id, "dev");
}

#[tokio::test]
async fn room_list_reports_fleet_capabilities_regardless_of_activity() {
    let (manager, _schedule) = manager(settings());
    let list = manager.get_room_list().await;
    assert_eq!(list.available_source_langs, vec!["en", "de"]);
    assert_eq!(list.available_target_langs, vec!["en", "de"]);
    assert_eq!(list.max_active_rooms, 1);
}

#[tokio::test]
async fn activating_an_unknown_room_fails_with_room_not_found() {
    let (manager, _schedule) = manager(settings());
    let err = manager
        .activate_room_as_host("no-such-room", "host-key", "en", "de", false, true)
        .await;
    assert!(matches!(err, Err(RoomsError::RoomNotFound(_))));
}

#[tokio::test]
async fn activating_with_an_unsupported_source_lang_is_rejected() {
    let (manager, schedule) = manager(settings());
    schedule.seed_events(vec![event("room-1")], Utc::now());
    let err = manager
        .activate_room_as_host("room-1", "host-key", "xx", "de", false, true)
        .await;
    assert!(matches!(err, Err(RoomsError::UnsupportedSourceLang(_))));
}

#[tokio::test]
async fn activating_with_an_unsupported_target_lang_is_rejected() {
    let (manager, schedule) = manager(settings());
    schedule.seed_events(vec![event("room-1")], Utc::now());
    let err = manager
        .activate_room_as_host("room-1", "host-key", "en", "xx", false, true)
        .await;
    assert!(matches!(err, Err(RoomsError::UnsupportedTargetLang(_))));
}

#[tokio::test]
async fn activating_a_do_not_record_room_is_rejected() {
    let (manager, schedule) = manager(settings());
    let mut ev = event("room-1");
    ev.do_not_record = true;
    schedule.seed_events(vec![ev], Utc::now());
    let err = manager
        .activate_room_as_host("room-1", "host-key", "en", "de", false, true)
        .await;
    assert!(matches!(err, Err(RoomsError::DoesNotPermitRecording)));
}

#[tokio::test]
async fn activating_at_zero_capacity_fails_before_spawning_anything() {
    let mut settings = settings();
    settings.rooms.max_active_rooms = 0;
    let (manager, schedule) = manager(settings);
    schedule.seed_events(vec![event("room-1")], Utc::now());
    let err = manager
        .activate_room_as_host("room-1", "host-key", "en", "de", false, true)
        .await;
    match err {
        Err(RoomsError::MaximumCapacity(0)) => {}
        other => panic!("expected MaximumCapacity(0), got {other:?}"),
    }
    assert!(err.unwrap_err().to_string().contains("Maximum capacity"));
}

#[tokio::test]
async fn joining_an_unknown_room_as_client_fails_with_room_not_found() {
    let (manager, _schedule) = manager(settings());
    let err = manager.join_room_as_client("no-such-room", "en").await;
    assert!(matches!(err, Err(RoomsError::RoomNotFound(_))));
}

#[tokio::test]
async fn joining_with_an_unsupported_target_lang_is_rejected_before_room_lookup() {
    let (manager, _schedule) = manager(settings());
    let err = manager.join_room_as_client("no-such-room", "xx").await;
    assert!(matches!(err, Err(RoomsError::UnsupportedTargetLang(_))));
}

#[tokio::test]
async fn restarting_an_unknown_room_engine_fails_with_room_not_found() {
    let (manager, _schedule) = manager(settings());
    let err = manager.restart_room_engine("no-such-room").await;
    assert!(matches!(err, Err(RoomsError::RoomNotFound(_))));
}

#[tokio::test]
async fn deactivating_an_unknown_room_fails_with_room_not_found() {
    let (manager, _schedule) = manager(settings());
    let err = manager.deactivate_room("no-such-room").await;
    assert!(matches!(err, Err(RoomsError::RoomNotFound(_))));
}
