use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{generate_sas, health_check, upload_file},
    state::AppState,
};

/// Build the application router.
///
/// Shared by `main` and the integration tests so both exercise the same routes and layers.
pub fn create_app(app_state: AppState) -> Router {
    let body_limit = usize::try_from(app_state.config.max_file_size).unwrap_or(usize::MAX);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/upload", post(upload_file))
        .route("/generate-sas", post(generate_sas))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
