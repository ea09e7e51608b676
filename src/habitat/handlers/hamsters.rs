use super::{fits, required, ApiError, ErrorBody, MAX_NAME_LENGTH};
use crate::{
    auth::Principal,
    store::{Hamster, HamsterInput, Store},
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    get,
    path = "/hamsters",
    responses (
        (status = 200, description = "All hamsters", body = [Hamster]),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "hamsters"
)]
pub async fn list_hamsters(
    _principal: Principal,
    store: Extension<Arc<dyn Store>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(store.list_hamsters().await?))
}

#[utoipa::path(
    post,
    path = "/hamsters",
    request_body = HamsterInput,
    responses (
        (status = 201, description = "Hamster created", body = Hamster),
        (status = 400, description = "Missing or too long fields", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Device not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "hamsters"
)]
#[instrument(skip(principal, store, payload), fields(user_id = principal.id))]
pub async fn create_hamster(
    principal: Principal,
    store: Extension<Arc<dyn Store>>,
    payload: Option<Json<HamsterInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(input)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };

    if required(&input.name).is_none() {
        return Err(ApiError::BadRequest("Missing required fields"));
    }

    if !fits(&input.name, MAX_NAME_LENGTH)
        || input
            .breed
            .as_deref()
            .is_some_and(|breed| !fits(breed, MAX_NAME_LENGTH))
    {
        return Err(ApiError::BadRequest("Field too long"));
    }

    if let Some(device_id) = input.device_id {
        if store.get_device(device_id).await?.is_none() {
            return Err(ApiError::NotFound("Device not found"));
        }
    }

    let id = store.insert_hamster(principal.id, input.clone()).await?;

    Ok((
        StatusCode::CREATED,
        Json(Hamster {
            id,
            user_id: principal.id,
            name: input.name,
            breed: input.breed,
            age: input.age,
            weight: input.weight,
            health_notes: input.health_notes,
            device_id: input.device_id,
        }),
    ))
}
