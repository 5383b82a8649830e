use axum::Router;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

/// `/` and `/dashboard` map to their HTML pages; any other path is looked up under
/// `static_dir`. Missing files are a plain 404.
pub fn asset_routes<S>(static_dir: &Path) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/dashboard", ServeFile::new(static_dir.join("dashboard.html")))
        .fallback_service(ServeDir::new(static_dir))
}
