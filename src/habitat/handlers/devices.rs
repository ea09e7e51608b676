//! Habitat sensor devices.

use super::{required, ApiError, ErrorBody};
use crate::{
    auth::Principal,
    store::{Device, DeviceInput, Store},
};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{debug, instrument};

fn validate(input: &DeviceInput) -> Result<(), ApiError> {
    if required(&input.name).is_none()
        || required(&input.device_type).is_none()
        || required(&input.model).is_none()
    {
        return Err(ApiError::BadRequest("Missing required fields"));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/devices",
    responses (
        (status = 200, description = "All devices", body = [Device]),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "devices"
)]
pub async fn list_devices(
    _principal: Principal,
    store: Extension<Arc<dyn Store>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(store.list_devices().await?))
}

#[utoipa::path(
    post,
    path = "/devices",
    request_body = DeviceInput,
    responses (
        (status = 201, description = "Device created", body = Device),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "devices"
)]
#[instrument(skip(principal, store, payload), fields(user_id = principal.id))]
pub async fn create_device(
    principal: Principal,
    store: Extension<Arc<dyn Store>>,
    payload: Option<Json<DeviceInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(input)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };
    validate(&input)?;

    let id = store.insert_device(Some(principal.id), input.clone()).await?;
    debug!("Device {id} created");

    Ok((
        StatusCode::CREATED,
        Json(Device {
            id,
            user_id: Some(principal.id),
            name: input.name,
            device_type: input.device_type,
            model: input.model,
            location: input.location,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/devices/{id}",
    params(("id" = i64, Path, description = "Device id")),
    responses (
        (status = 200, description = "The device", body = Device),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Device not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "devices"
)]
pub async fn get_device(
    _principal: Principal,
    store: Extension<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let device = store
        .get_device(id)
        .await?
        .ok_or(ApiError::NotFound("Device not found"))?;
    Ok(Json(device))
}

#[utoipa::path(
    put,
    path = "/devices/{id}",
    params(("id" = i64, Path, description = "Device id")),
    request_body = DeviceInput,
    responses (
        (status = 200, description = "Device updated", body = Device),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Device not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "devices"
)]
#[instrument(skip(_principal, store, payload))]
pub async fn update_device(
    _principal: Principal,
    store: Extension<Arc<dyn Store>>,
    Path(id): Path<i64>,
    payload: Option<Json<DeviceInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(input)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };
    validate(&input)?;

    if !store.update_device(id, input).await? {
        return Err(ApiError::NotFound("Device not found"));
    }

    let device = store
        .get_device(id)
        .await?
        .ok_or(ApiError::NotFound("Device not found"))?;
    Ok(Json(device))
}

#[utoipa::path(
    delete,
    path = "/devices/{id}",
    params(("id" = i64, Path, description = "Device id")),
    responses (
        (status = 204, description = "Device deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Device not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "devices"
)]
#[instrument(skip(_principal, store))]
pub async fn delete_device(
    _principal: Principal,
    store: Extension<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if store.delete_device(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Device not found"))
    }
}
