pub mod cache_handler;
pub mod comparison;
pub mod locations;
pub mod planner;
pub mod search;

use axum::extract::{rejection::QueryRejection, Query};
use chrono::{Local, NaiveDate};

use crate::error::HttpError;

/// Requests are judged against the server's local calendar day.
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Unwrap a query extractor, turning a malformed query string into a 400.
pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, HttpError> {
    query
        .map(|Query(params)| params)
        .map_err(HttpError::from_query_rejection)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{
        config::Config,
        db::{cache::MemoryCache, memory::fixtures::Sample, memory::MemoryStore},
        routes::create_router,
        AppState,
    };

    pub fn app(store: MemoryStore) -> Router {
        let state = AppState::new(Config::init(), Arc::new(store), Arc::new(MemoryCache::new()));
        create_router(Arc::new(state))
    }

    pub fn sample_app(sample: Sample) -> Router {
        app(sample.store)
    }

    pub async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        send(app, "GET", uri).await
    }
}
