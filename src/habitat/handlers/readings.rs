//! Temperature and humidity readings reported by habitat sensors.

use super::{ApiError, ErrorBody};
use crate::{
    auth::Principal,
    store::{Reading, ReadingInput, Store},
};
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::IntoParams;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct ReadingsQuery {
    /// Number of readings to return, newest first (1..=1000, default 100).
    limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/devices/{id}/readings",
    params(("id" = i64, Path, description = "Device id"), ReadingsQuery),
    responses (
        (status = 200, description = "Readings, newest first", body = [Reading]),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Device not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "readings"
)]
pub async fn list_readings(
    _principal: Principal,
    store: Extension<Arc<dyn Store>>,
    Path(id): Path<i64>,
    Query(query): Query<ReadingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if store.get_device(id).await?.is_none() {
        return Err(ApiError::NotFound("Device not found"));
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    Ok(Json(store.list_readings(id, limit).await?))
}

#[utoipa::path(
    post,
    path = "/devices/{id}/readings",
    params(("id" = i64, Path, description = "Device id")),
    request_body = ReadingInput,
    responses (
        (status = 201, description = "Reading recorded", body = Reading),
        (status = 400, description = "Missing or invalid fields", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Device not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "readings"
)]
#[instrument(skip(_principal, store, payload))]
pub async fn record_reading(
    _principal: Principal,
    store: Extension<Arc<dyn Store>>,
    Path(id): Path<i64>,
    payload: Option<Json<ReadingInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(input)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };

    if !input.temperature.is_finite() || !input.humidity.is_finite() {
        return Err(ApiError::BadRequest("Invalid reading"));
    }

    if store.get_device(id).await?.is_none() {
        return Err(ApiError::NotFound("Device not found"));
    }

    let reading = store.insert_reading(id, input).await?;

    Ok((StatusCode::CREATED, Json(reading)))
}
