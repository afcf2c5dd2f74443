// handler/search.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde_json::json;

use super::{query_params, today};
use crate::{dtos::searchdtos::SearchQueryDto, error::HttpError, AppState};

pub fn search_handler() -> Router {
    Router::new().route("/search", get(search))
}

pub async fn search(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<SearchQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let query = query_params(query)?;
    let page = query.page();
    let criteria = query.into_criteria(today()).map_err(HttpError::invalid_input)?;

    let response = app_state.search_service.search(&criteria, page).await?;

    Ok(Json(json!({
        "status": "success",
        "data": response,
    })))
}
