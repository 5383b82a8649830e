pub mod config;
pub mod error;
pub mod handlers;
pub mod notifier;
pub mod sheets;
pub mod state;
pub mod store;
pub mod testing;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;

/// Full HTTP surface: rate API, health probe and the front-end's static files.
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .merge(rate_routes())
        .merge(handlers::asset_routes(&config.server.static_dir))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response));

    // Global middleware
    if config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn rate_routes() -> Router<AppState> {
    Router::new()
        .route("/api/data", get(handlers::rates_list))
        .route("/api/guardar", post(handlers::rates_save))
}

/// Last-resort boundary for failures nothing else anticipated
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unexpected error".to_string()
    };
    tracing::error!("Handler panicked: {}", message);

    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))).into_response()
}
