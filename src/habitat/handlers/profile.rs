use super::{ApiError, ErrorBody};
use crate::{
    auth::Principal,
    store::{Store, User},
};
use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/profile",
    responses (
        (status = 200, description = "The caller's account", body = User),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Account no longer exists", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn profile(
    principal: Principal,
    store: Extension<Arc<dyn Store>>,
) -> Result<impl IntoResponse, ApiError> {
    let account = store
        .find_account_by_id(principal.id)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(User::from(account)))
}
