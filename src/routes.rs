// routes.rs
use std::sync::Arc;

use axum::{routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        cache_handler::cache_handler, comparison::comparison_handler,
        locations::locations_handler, planner::planner_handler, search::search_handler,
    },
    AppState,
};

// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .merge(locations_handler())
        .merge(search_handler())
        .merge(comparison_handler())
        .merge(planner_handler())
        .merge(cache_handler())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::db::memory::MemoryStore;
    use crate::handler::test_support::{app, get};

    #[tokio::test]
    async fn health_needs_no_data() {
        let (status, body) = get(app(MemoryStore::new()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let (status, _) = get(app(MemoryStore::new()), "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
