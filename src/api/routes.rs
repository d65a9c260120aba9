use axum::{
    extract::Request,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Level;

use super::handlers::{audit, commands, frequency, health, site, AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/site", get(site::get_site))
        .route("/api/v1/site/refresh", post(site::refresh))
        .route("/api/v1/diesel/engine/toggle", post(site::toggle_diesel_engine))
        .route("/api/v1/ess/power/toggle", post(site::toggle_ess_power))
        .route(
            "/api/v1/pcs/frequency/edit",
            post(frequency::begin_edit)
                .put(frequency::commit_edit)
                .delete(frequency::cancel_edit),
        )
        .route("/api/v1/pcs/frequency/reset", post(frequency::reset))
        .route("/api/v1/commands", post(commands::execute))
        .route("/api/v1/audit", get(audit::list))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
}
