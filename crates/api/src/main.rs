use std::sync::Arc;
use std::time::Duration;

use transcast_api::{build_router, state::AppState};
use transcast_config::Settings;
use transcast_rooms::{AuthStore, RoomManager, ScheduleProvider, VoteTally};
use transcast_translation::LibreTranslateClient;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "transcast_api=debug,transcast_rooms=debug,transcast_translation=debug,tower_http=debug"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!(host = %settings.app.host, port = settings.app.port, "starting transcast-api");

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
    match schedule.update_data().await {
        Ok(true) => info!("initial schedule fetched"),
        Ok(false) => {}
        Err(err) => warn!(%err, "initial schedule fetch failed, will retry on the next poll"),
    }
    spawn_schedule_refresh(Arc::clone(&schedule), settings.schedule.cache_minutes);
    let votes = Arc::new(VoteTally::new(&settings.storage.votes_dir, Arc::clone(&schedule)));

    let mt_client: Arc<dyn transcast_translation::MtClient> = Arc::new(LibreTranslateClient::new(
        &settings.translation.mt_host,
        settings.translation.mt_port,
        settings.translation.supported_langs_endpoint.clone(),
    ));
    let mt_supported_langs = match mt_client.supported_languages().await {
        Ok(langs) => langs,
        Err(err) => {
            warn!(%err, "failed to fetch MT supported languages at startup, target language validation will reject everything until restarted");
            Vec::new()
        }
    };
    let transcripts = Arc::new(transcast_rooms::TranscriptStore::new(
        settings.storage.transcript_root.clone(),
        settings.storage.access_conf_name.clone(),
    ));
    let rooms = RoomManager::new(
        settings.clone(),
        Arc::clone(&schedule),
        transcripts,
        mt_client,
        mt_supported_langs,
    );

    let app_state = AppState {
        settings: settings.clone(),
        rooms,
        auth,
        schedule,
        votes,
    };

    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}

fn spawn_schedule_refresh(schedule: Arc<ScheduleProvider>, cache_minutes: i64) {
    let interval = Duration::from_secs((cache_minutes.max(1) as u64) * 60);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match schedule.update_data().await {
                Ok(true) => info!("schedule refetched"),
                Ok(false) => {}
                Err(err) => warn!(%err, "scheduled schedule refresh failed"),
            }
        }
    });
}
