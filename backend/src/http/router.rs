//! Router configuration for the HTTP API.
//!
//! Share endpoints live at the root (the dashboard front end calls them by
//! those paths); call and coaching endpoints are versioned under `/v1`.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Transcripts can be long; everything else is small.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/calls", get(handlers::list_calls).post(handlers::create_call))
        .route("/calls/reprocess", post(handlers::reprocess_calls))
        .route("/calls/{call_id}", get(handlers::get_call))
        .route("/calls/{call_id}/duration", put(handlers::update_call_duration))
        .route("/calls/{call_id}/coaching", post(handlers::process_call))
        .route("/calls/{call_id}/objections", get(handlers::get_objections))
        .route("/calls/{call_id}/questions", get(handlers::get_questions))
        .route("/calls/{call_id}/coaching-report", get(handlers::get_coaching_report))
        .route("/jobs/{job_id}", get(handlers::get_job_status))
        .route("/jobs/{job_id}/logs", get(handlers::stream_job_logs));

    let sharing = Router::new()
        .route("/share/create", post(handlers::create_share))
        .route("/share/verify/{token}", get(handlers::verify_share))
        .route("/share/{token}", delete(handlers::revoke_share))
        .route("/shares/my", get(handlers::list_my_shares));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(sharing)
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LocalRepository;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let state = AppState::with_defaults(Arc::new(LocalRepository::new()));
        let _router = create_router(state);
    }
}
