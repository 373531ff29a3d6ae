use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Top-level process configuration, loaded once at startup from a YAML
/// file and overridable via `TRANSCAST__`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub auth: AuthSettings,
    pub schedule: ScheduleSettings,
    pub asr: AsrSettings,
    pub translation: TranslationSettings,
    pub rooms: RoomSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    pub host_password: String,
    pub admin_password: String,
    pub key_ttl_hours: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleSettings {
    pub url: String,
    pub cache_minutes: i64,
    pub dev_room_id: String,
    /// Overrides "now" for ongoing-event computation; tests only.
    pub fake_now: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AsrSettings {
    pub supported_langs: Vec<String>,
    pub model: String,
    pub device: String,
    pub compute_type: String,
    pub diarization: bool,
    pub vac: bool,
    pub buffer_trimming: String,
    pub min_chunk_size: f64,
    pub vac_chunk_size: f64,
    /// Path to the room-worker child binary, spawned once per active room.
    pub worker_bin: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranslationSettings {
    pub mt_host: String,
    pub mt_port: u16,
    pub supported_langs_endpoint: String,
    pub poll_interval_secs: f64,
    pub max_batch_per_cycle: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoomSettings {
    pub max_active_rooms: usize,
    pub idle_close_secs: u64,
    pub compare_depth: usize,
    pub broadcast_sentences: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub transcript_root: String,
    pub votes_dir: String,
    pub access_conf_name: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("TRANSCAST"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("auth.host_password", "change-me-host")?
            .set_default("auth.admin_password", "change-me-admin")?
            .set_default("auth.key_ttl_hours", 3)?
            .set_default("schedule.url", "https://example.org/schedule.json")?
            .set_default("schedule.cache_minutes", 5)?
            .set_default("schedule.dev_room_id", "dev")?
            .set_default("schedule.fake_now", None::<String>)?
            .set_default("asr.supported_langs", vec!["en", "de"])?
            .set_default("asr.model", "base")?
            .set_default("asr.device", "cpu")?
            .set_default("asr.compute_type", "int8")?
            .set_default("asr.diarization", false)?
            .set_default("asr.vac", true)?
            .set_default("asr.buffer_trimming", "segment")?
            .set_default("asr.min_chunk_size", 1.0)?
            .set_default("asr.vac_chunk_size", 0.04)?
            .set_default("asr.worker_bin", "transcast-asr-worker")?
            .set_default("translation.mt_host", "127.0.0.1")?
            .set_default("translation.mt_port", 5500)?
            .set_default("translation.supported_langs_endpoint", "/languages")?
            .set_default("translation.poll_interval_secs", 1.0)?
            .set_default("translation.max_batch_per_cycle", 4)?
            .set_default("rooms.max_active_rooms", 4)?
            .set_default("rooms.idle_close_secs", 300)?
            .set_default("rooms.compare_depth", 10)?
            .set_default("rooms.broadcast_sentences", 20)?
            .set_default("storage.transcript_root", "transcripts_db")?
            .set_default("storage.votes_dir", "votes_db")?
            .set_default("storage.access_conf_name", "access.conf")?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load().expect("failed to load default settings")
    }
}
