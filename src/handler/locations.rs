// handler/locations.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde_json::json;

use super::{query_params, today};
use crate::{
    dtos::locationdtos::{
        CityDto, CompareOptionsQueryDto, NeighborhoodDto, NeighborhoodQueryDto, OptionStep,
        OptionsQueryDto,
    },
    error::HttpError,
    AppState,
};

pub fn locations_handler() -> Router {
    Router::new()
        .route("/cities", get(get_cities))
        .route("/cities/with-data", get(get_cities_with_data))
        .route("/neighborhoods", get(get_neighborhoods))
        .route("/dates", get(get_dates))
        .route("/guests", get(get_guests))
        .route("/nights", get(get_nights))
        .route("/compare/dates", get(get_compare_dates))
        .route("/compare/guests", get(get_compare_guests))
        .route("/compare/nights", get(get_compare_nights))
}

pub async fn get_cities(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let cities = app_state.location_service.cities().await?;

    Ok(Json(json!({
        "status": "success",
        "data": CityDto::filter_cities(&cities),
    })))
}

pub async fn get_cities_with_data(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let cities = app_state.location_service.cities_with_data(today()).await?;

    Ok(Json(json!({
        "status": "success",
        "data": CityDto::filter_cities(&cities),
    })))
}

pub async fn get_neighborhoods(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<NeighborhoodQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let query = query_params(query)?;
    let city_id = query.city_id().map_err(HttpError::invalid_input)?;

    let neighborhoods = app_state
        .location_service
        .neighborhoods(city_id, query.with_data.unwrap_or(false), today())
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": NeighborhoodDto::filter_neighborhoods(&neighborhoods),
    })))
}

pub async fn get_dates(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<OptionsQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let criteria = query_params(query)?
        .into_criteria(OptionStep::Dates)
        .map_err(HttpError::invalid_input)?;

    let dates = app_state.location_service.dates(&criteria, today()).await?;

    Ok(Json(json!({ "status": "success", "data": dates })))
}

pub async fn get_guests(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<OptionsQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let criteria = query_params(query)?
        .into_criteria(OptionStep::Guests)
        .map_err(HttpError::invalid_input)?;

    let guests = app_state.location_service.guests(&criteria).await?;

    Ok(Json(json!({ "status": "success", "data": guests })))
}

pub async fn get_nights(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<OptionsQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let criteria = query_params(query)?
        .into_criteria(OptionStep::Nights)
        .map_err(HttpError::invalid_input)?;

    let nights = app_state.location_service.nights(&criteria).await?;

    Ok(Json(json!({ "status": "success", "data": nights })))
}

pub async fn get_compare_dates(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<CompareOptionsQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let criteria = query_params(query)?
        .into_criteria(OptionStep::Dates)
        .map_err(HttpError::invalid_input)?;

    let dates = app_state.location_service.dates(&criteria, today()).await?;

    Ok(Json(json!({ "status": "success", "data": dates })))
}

pub async fn get_compare_guests(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<CompareOptionsQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let criteria = query_params(query)?
        .into_criteria(OptionStep::Guests)
        .map_err(HttpError::invalid_input)?;

    let guests = app_state.location_service.guests(&criteria).await?;

    Ok(Json(json!({ "status": "success", "data": guests })))
}

pub async fn get_compare_nights(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<CompareOptionsQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let criteria = query_params(query)?
        .into_criteria(OptionStep::Nights)
        .map_err(HttpError::invalid_input)?;

    let nights = app_state.location_service.nights(&criteria).await?;

    Ok(Json(json!({ "status": "success", "data": nights })))
}
