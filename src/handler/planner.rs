// handler/planner.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde_json::json;

use super::{query_params, today};
use crate::{dtos::plannerdtos::PlannerQueryDto, error::HttpError, AppState};

pub fn planner_handler() -> Router {
    Router::new()
        .route("/planner", get(plan))
        .route("/planner/quick-stats", get(quick_stats))
}

pub async fn plan(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<PlannerQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let criteria = query_params(query)?
        .into_criteria(today())
        .map_err(HttpError::invalid_input)?;

    let report = app_state.planner_service.plan(&criteria).await?;

    Ok(Json(json!({
        "status": "success",
        "data": report,
    })))
}

pub async fn quick_stats(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state.planner_service.quick_stats(today()).await?;

    Ok(Json(json!({
        "status": "success",
        "data": stats,
    })))
}
