//! Authenticated principal extraction and authorization helpers.
//!
//! Flow Overview: read the `Authorization: Bearer <token>` header, verify the
//! token with the shared [`Authenticator`] and hand the caller's identity to
//! the handler. Tokens are stateless, so no store lookup happens here.

use super::{AuthError, Authenticator};
use crate::store::Role;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;
use tracing::error;

/// Authenticated user context derived from the bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl Principal {
    /// # Errors
    /// `AuthError::Forbidden` unless the principal is an admin.
    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the bearer token into a principal, or return 401.
///
/// # Errors
/// `AuthError::MissingToken` without a usable header, `AuthError::Token` when
/// the token is refused.
pub fn require_auth(headers: &HeaderMap, auth: &Authenticator) -> Result<Principal, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
    let claims = auth.verify_request_token(token)?;
    Ok(Principal {
        id: claims.id,
        email: claims.email,
        role: claims.role,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(auth) = parts.extensions.get::<Arc<Authenticator>>() else {
            error!("Authenticator extension missing from router");
            return Err(AuthError::Internal("authenticator not configured"));
        };
        require_auth(&parts.headers, auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn require_admin_checks_role() {
        let mut principal = Principal {
            id: 1,
            email: "a@x.com".to_string(),
            role: Role::Admin,
        };
        assert!(principal.require_admin().is_ok());
        principal.role = Role::Normal;
        assert_eq!(principal.require_admin(), Err(AuthError::Forbidden));
    }
}
