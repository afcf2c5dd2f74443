// handler/comparison.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde_json::json;

use super::{query_params, today};
use crate::{dtos::comparisondtos::CompareQueryDto, error::HttpError, AppState};

pub fn comparison_handler() -> Router {
    Router::new().route("/compare", get(compare))
}

pub async fn compare(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<CompareQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let today = today();
    let criteria = query_params(query)?
        .into_criteria(today)
        .map_err(HttpError::invalid_input)?;

    let report = app_state.comparison_service.compare(&criteria, today).await?;

    Ok(Json(json!({
        "status": "success",
        "data": report,
    })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::db::memory::fixtures::{check_in, sample};
    use crate::handler::test_support::{get, sample_app};

    #[tokio::test]
    async fn compares_two_cities() {
        let sample = sample().await;
        let uri = format!(
            "/api/compare?city_1={}&city_2={}&check_in={}&guests=2&nights=3",
            sample.florianopolis.id,
            sample.gramado.id,
            check_in()
        );
        let (status, body) = get(sample_app(sample), &uri).await;
        assert_eq!(status, StatusCode::OK);

        let data = &body["data"];
        assert_eq!(data["location_1"]["location"]["name"], "Florianópolis, SC");
        assert_eq!(data["comparison"]["status"], "computed");
        assert_eq!(data["comparison"]["cheaper_location"], 1);
    }

    #[tokio::test]
    async fn unknown_location_is_not_found() {
        let sample = sample().await;
        let uri = format!(
            "/api/compare?city_1={}&city_2=9999&check_in={}&guests=2&nights=3",
            sample.florianopolis.id,
            check_in()
        );
        let (status, body) = get(sample_app(sample), &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn out_of_range_nights_are_rejected() {
        let sample = sample().await;
        let uri = format!(
            "/api/compare?city_1={}&city_2={}&check_in={}&guests=2&nights=31",
            sample.florianopolis.id,
            sample.gramado.id,
            check_in()
        );
        let (status, body) = get(sample_app(sample), &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["nights"].is_array());
    }
}
