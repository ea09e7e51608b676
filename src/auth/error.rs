//! Auth error taxonomy and its mapping to HTTP responses.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Token expired")]
    Expired,
}

/// Messages are safe to show to clients: they never carry passwords, hashes
/// or key material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Wrong password and unknown email look the same to the caller.
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Too many attempts, retry after {retry_after_seconds} seconds")]
    TooManyAttempts { retry_after_seconds: u64 },
    #[error("Missing bearer token")]
    MissingToken,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("Email already registered")]
    EmailTaken,
    #[error("Forbidden")]
    Forbidden,
    #[error("Internal error: {0}")]
    Internal(&'static str),
}

impl AuthError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::MissingToken | Self::Token(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::TooManyAttempts { .. } | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::EmailTaken => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();

        if let Self::TooManyAttempts {
            retry_after_seconds,
        } = self
        {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_seconds));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::TooManyAttempts {
                retry_after_seconds: 10
            }
            .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::Token(TokenError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::EmailTaken.status(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::Internal("boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn too_many_attempts_sets_retry_after() {
        let response = AuthError::TooManyAttempts {
            retry_after_seconds: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(RETRY_AFTER),
            Some(&HeaderValue::from(42_u64))
        );
    }

    #[test]
    fn token_errors_display_without_prefix() {
        assert_eq!(
            AuthError::from(TokenError::InvalidSignature).to_string(),
            "Invalid token signature"
        );
    }
}
