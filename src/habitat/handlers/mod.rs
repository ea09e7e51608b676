pub mod blog;
pub mod devices;
pub mod hamsters;
pub mod health;
pub mod login;
pub mod profile;
pub mod readings;
pub mod register;
pub mod root;
pub mod users;


// common functions for the handlers
use crate::{auth::AuthError, store::StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

/// Body of every error response.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Message {
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    BadRequest(&'static str),
    NotFound(&'static str),
    Store(StoreError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(err) => err.into_response(),
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            Self::Store(err) => {
                error!("Failed to handle request: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Column widths of the bounded text fields.
pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_EMAIL_LENGTH: usize = 100;

/// Whether `value` fits a column of `max` characters.
pub fn fits(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

/// Trimmed, non-empty value of a required text field.
pub fn required(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod helper_tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(valid_email("a@x.com"));
        assert!(!valid_email("a@x"));
        assert!(!valid_email("a x@y.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn required_fields() {
        assert_eq!(required("  name "), Some("name"));
        assert_eq!(required("   "), None);
    }

    #[test]
    fn field_widths_count_characters() {
        assert!(fits(&"a".repeat(50), MAX_NAME_LENGTH));
        assert!(!fits(&"a".repeat(51), MAX_NAME_LENGTH));
        assert!(fits(&"é".repeat(50), MAX_NAME_LENGTH));
    }

    #[test]
    fn store_errors_are_generic() {
        let response = ApiError::Store(StoreError::Corrupt("role".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
