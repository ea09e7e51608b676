use super::{ApiError, ErrorBody};
use crate::{
    auth::Principal,
    store::{Store, User},
};
use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/users",
    responses (
        (status = 200, description = "All accounts", body = [User]),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn list_users(
    principal: Principal,
    store: Extension<Arc<dyn Store>>,
) -> Result<impl IntoResponse, ApiError> {
    principal.require_admin()?;

    let users: Vec<User> = store
        .list_accounts()
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(Json(users))
}
