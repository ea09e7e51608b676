use super::{fits, required, valid_email, ApiError, ErrorBody, MAX_EMAIL_LENGTH, MAX_NAME_LENGTH};
use crate::{
    auth::{Authenticator, Registration},
    store::Role,
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    /// `admin` or `normal`, defaults to `normal`.
    #[serde(default)]
    role: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Registered {
    pub message: String,
    pub user_id: i64,
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses (
        (status = 201, description = "Registration successful", body = Registered, content_type = "application/json"),
        (status = 400, description = "Missing, invalid or too long fields", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
    ),
    tag = "auth"
)]
// axum handler for register
#[instrument(skip(auth, payload))]
pub async fn register(
    auth: Extension<Arc<Authenticator>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };

    let (Some(name), Some(email)) = (required(&request.name), required(&request.email)) else {
        return Err(ApiError::BadRequest("Missing required fields"));
    };

    if request.password.is_empty() {
        return Err(ApiError::BadRequest("Missing required fields"));
    }

    if !fits(name, MAX_NAME_LENGTH) || !fits(email, MAX_EMAIL_LENGTH) {
        return Err(ApiError::BadRequest("Field too long"));
    }

    if !valid_email(email) {
        return Err(ApiError::BadRequest("Invalid email"));
    }

    let role = match request.role.as_deref().map(str::parse::<Role>) {
        None => Role::default(),
        Some(Ok(role)) => role,
        Some(Err(_)) => return Err(ApiError::BadRequest("Invalid role")),
    };

    let user_id = auth
        .register(Registration {
            name: name.to_string(),
            email: email.to_string(),
            password: request.password,
            role,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Registered {
            message: "User registered successfully".to_string(),
            user_id,
        }),
    ))
}
