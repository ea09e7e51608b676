use super::{required, ApiError, ErrorBody};
use crate::auth::{Authenticator, LoginOutcome};
use axum::{extract::Extension, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login successful", body = LoginOutcome, content_type = "application/json"),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 401, description = "Incorrect email or password", body = ErrorBody),
        (status = 403, description = "Too many failed attempts, see Retry-After", body = ErrorBody),
    ),
    tag = "auth"
)]
// axum handler for login
#[instrument(skip(auth, payload))]
pub async fn login(
    auth: Extension<Arc<Authenticator>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };

    let Some(email) = required(&request.email) else {
        return Err(ApiError::BadRequest("Missing required fields"));
    };

    if request.password.is_empty() {
        return Err(ApiError::BadRequest("Missing required fields"));
    }

    let outcome = auth.login(email, &request.password).await?;

    Ok(Json(outcome))
}
