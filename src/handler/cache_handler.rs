// handler/cache_handler.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::query_params;
use crate::{
    db::cache::{namespace, CacheKey},
    error::HttpError,
    AppState,
};

const NAMESPACES: [&str; 5] = [
    namespace::SEARCH,
    namespace::CHART,
    namespace::TREND,
    namespace::COMPARISON,
    namespace::QUICK_STATS,
];

#[derive(Debug, Default, Deserialize)]
pub struct InvalidateQueryDto {
    /// A cache namespace; absent clears every namespace.
    pub prefix: Option<String>,
}

pub fn cache_handler() -> Router {
    Router::new()
        .route("/cache/health", get(cache_health_check))
        .route("/cache/invalidate", post(invalidate_cache))
}

/// Health check endpoint for the query cache
pub async fn cache_health_check(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let backend = app_state.cache.backend();

    match app_state.cache.ping().await {
        Ok(()) => Ok(Json(json!({
            "status": "healthy",
            "backend": backend,
            "message": "Cache is responding normally"
        }))),
        Err(e) => {
            tracing::error!("Cache health check failed: {}", e);
            Ok(Json(json!({
                "status": "unhealthy",
                "backend": backend,
                "message": "Cache is not responding; requests fall through to the store"
            })))
        }
    }
}

pub async fn invalidate_cache(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<InvalidateQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let query = query_params(query)?;

    let prefix = query.prefix.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let targets: Vec<&str> = match prefix {
        Some(prefix) => match NAMESPACES.iter().find(|ns| **ns == prefix) {
            Some(ns) => vec![*ns],
            None => {
                return Err(HttpError::bad_request(format!(
                    "Unknown cache prefix '{}'. Expected one of: {}",
                    prefix,
                    NAMESPACES.join(", ")
                )))
            }
        },
        None => NAMESPACES.to_vec(),
    };

    let mut removed = 0u64;
    for ns in &targets {
        removed += app_state.cache.invalidate(&CacheKey::prefix(ns)).await?;
    }
    tracing::info!("Cache invalidated for {:?}: {} keys removed", targets, removed);

    Ok(Json(json!({
        "status": "success",
        "data": {
            "namespaces": targets,
            "removed": removed,
        }
    })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::db::memory::fixtures::sample;
    use crate::handler::test_support::{get, sample_app, send};

    #[tokio::test]
    async fn memory_cache_is_always_healthy() {
        let (status, body) = get(sample_app(sample().await), "/api/cache/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["backend"], "memory");
    }

    #[tokio::test]
    async fn invalidate_clears_cached_payloads() {
        let app = sample_app(sample().await);
        let (status, _) = get(app.clone(), "/api/planner/quick-stats").await;
        assert_eq!(status, StatusCode::OK);

        let uri = "/api/cache/invalidate?prefix=quick_stats";
        let (status, body) = send(app.clone(), "POST", uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["removed"], 1);

        let (status, _) = send(app, "POST", "/api/cache/invalidate?prefix=sessions").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
