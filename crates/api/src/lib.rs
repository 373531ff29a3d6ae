pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/login", post(routes::auth::login))
        .route("/auth", post(routes::auth::auth))
        .route("/validate", post(routes::auth::validate))
        .route("/room_list", get(routes::rooms::room_list))
        .route("/room/{room_id}/close", post(routes::rooms::close))
        .route(
            "/room/{room_id}/transcript/{lang}",
            post(routes::transcripts::get),
        )
        .route(
            "/room/{room_id}/{role}/{source_lang}/{target_lang}",
            get(ws::handler::ws_upgrade),
        )
        .route("/transcript_list", post(routes::transcripts::list))
        .route("/vote", get(routes::votes::list))
        .route("/vote/{event_code}/add", get(routes::votes::add))
        .route("/vote/{event_code}/remove", get(routes::votes::remove))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
