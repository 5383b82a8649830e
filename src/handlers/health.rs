use axum::response::{IntoResponse, Json};
use serde_json::json;

/// GET /health - process liveness; does not touch the sheet or the webhook
pub async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": now,
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}
