pub mod handlers;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::ServerState;

pub struct AppRouter;

impl AppRouter {
    pub fn create(state: ServerState) -> Router {
        let cors_layer = CorsLayer::permissive();

        Router::new()
            .route("/", get(|| async { "Inbox agent server" }))
            .route("/api/cron/agent-runner", get(handlers::cron::agent_runner))
            .route("/api/jobs/run-triage", get(handlers::triage::run_triage))
            .route(
                "/api/jobs/send-summaries",
                get(handlers::digest::send_summaries),
            )
            .route("/api/rules", post(handlers::rules::create_rule))
            .route(
                "/api/settings/agent",
                post(handlers::settings::update_agent_settings),
            )
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer)
            .with_state(state)
            .fallback(handler_404)
    }
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
