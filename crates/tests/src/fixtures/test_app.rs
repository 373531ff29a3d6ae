use std::net::SocketAddr;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::net::TcpListener;

use transcast_api::{build_router, state::AppState};
use transcast_config::{
    AppSettings, AsrSettings, AuthSettings, RoomSettings, ScheduleSettings, Settings,
    StorageSettings, TranslationSettings,
};
use chrono::Utc;
use transcast_rooms::{AuthStore, Event, RoomManager, ScheduleProvider, TranscriptStore, VoteTally};

use super::fake_mt::FakeMtClient;

/// A running `transcast-api` server bound to a random port, backed by
/// temp-directory storage and a fake machine-translation sidecar so no
/// external process is required.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub settings: Settings,
    pub client: reqwest::Client,
    pub schedule: Arc<ScheduleProvider>,
    _transcripts_dir: TempDir,
    _votes_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawns a test server, letting the caller tweak settings (e.g.
    /// `asr.supported_langs`, `rooms.max_active_rooms`) before boot.
    pub async fn spawn_with(mutator: impl FnOnce(&mut Settings)) -> Self {
        let transcripts_dir = tempfile::tempdir().unwrap();
        let votes_dir = tempfile::tempdir().unwrap();

        let mut settings = test_settings(&transcripts_dir, &votes_dir);
        mutator(&mut settings);

        let auth = Arc::new(AuthStore::new(
            settings.auth.host_password.clone(),
            settings.auth.admin_password.clone(),
            settings.auth.key_ttl_hours,
        ));
        let schedule = Arc::new(ScheduleProvider::new(
            settings.schedule.url.clone(),
            settings.schedule.cache_minutes,
            settings.schedule.fake_now,
        ));
        let votes = Arc::new(VoteTally::new(
            &settings.storage.votes_dir,
            Arc::clone(&schedule),
        ));
        let transcripts = Arc::new(TranscriptStore::new(
            settings.storage.transcript_root.clone(),
            settings.storage.access_conf_name.clone(),
        ));
        let mt_client = Arc::new(FakeMtClient::new(["en", "de", "fr"]));
        let rooms = RoomManager::new(
            settings.clone(),
            Arc::clone(&schedule),
            transcripts,
            mt_client,
            vec!["en".into(), "de".into(), "fr".into()],
        );

        let app_state = AppState {
            settings: settings.clone(),
            rooms,
            auth,
            schedule,
            votes,
        };
        let app = build_router(app_state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{addr}");
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .unwrap();

        Self {
            addr,
            base_url,
            settings,
            client,
            schedule,
            _transcripts_dir: transcripts_dir,
            _votes_dir: votes_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Seeds the schedule cache with a single ongoing event with the given
    /// code, so tests can exercise room/vote/transcript flows that require
    /// a known event without a live schedule HTTP fetch.
    pub fn seed_event(&self, code: &str) {
        let now = Utc::now();
        self.schedule.seed_events(
            vec![Event {
                code: code.into(),
                title: "Test Talk".into(),
                track: "main".into(),
                location: "hall".into(),
                start: now,
                duration_minutes: 60,
                presenter: "someone".into(),
                description: String::new(),
                do_not_record: false,
            }],
            now,
        );
    }
}

fn test_settings(transcripts_dir: &TempDir, votes_dir: &TempDir) -> Settings {
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
            supported_langs: vec!["en".into(), "de".into(), "fr".into()],
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
            max_active_rooms: 4,
            idle_close_secs: 300,
            compare_depth: 10,
            broadcast_sentences: 20,
        },
        storage: StorageSettings {
            transcript_root: transcripts_dir.path().to_string_lossy().into_owned(),
            votes_dir: votes_dir.path().to_string_lossy().into_owned(),
            access_conf_name: "access.conf".into(),
        },
    }
}
