//! HMAC-signed session tokens (compact JWS).
//!
//! Layout is `base64url(header).base64url(claims).base64url(signature)`
//! without padding. Verification order is fixed: structure, then signature,
//! then claims, then expiry. Claims are never decoded from a token whose
//! signature has not been checked.

use super::{clock::now_unix_seconds, AuthError, TokenError};
use crate::store::Role;
use anyhow::{bail, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::{fmt, str::FromStr, time::Duration};
use tracing::error;
use utoipa::ToSchema;

/// Shorter secrets are refused at startup.
pub const MIN_SECRET_LENGTH: usize = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenAlgorithm {
    #[default]
    Hs256,
    Hs384,
    Hs512,
}

impl TokenAlgorithm {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }
}

impl fmt::Display for TokenAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            other => Err(format!("unsupported token algorithm: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Who the token is issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

#[derive(ToSchema, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

pub struct TokenService {
    secret: SecretString,
    algorithm: TokenAlgorithm,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"***")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value).map_err(|err| {
        error!("Failed to encode token segment: {err}");
        AuthError::Internal("token encoding failed")
    })?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(segment).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

impl TokenService {
    /// # Errors
    /// Returns an error if the secret is shorter than [`MIN_SECRET_LENGTH`] bytes.
    pub fn new(secret: SecretString, algorithm: TokenAlgorithm) -> Result<Self> {
        let length = secret.expose_secret().len();
        if length < MIN_SECRET_LENGTH {
            bail!(
                "token signing secret must be at least {MIN_SECRET_LENGTH} bytes, got {length}"
            );
        }
        Ok(Self { secret, algorithm })
    }

    #[must_use]
    pub fn algorithm(&self) -> TokenAlgorithm {
        self.algorithm
    }

    fn key(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }

    fn sign(&self, input: &[u8]) -> Result<Vec<u8>, hmac::digest::InvalidLength> {
        let key = self.key();
        Ok(match self.algorithm {
            TokenAlgorithm::Hs256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)?;
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
            TokenAlgorithm::Hs384 => {
                let mut mac = Hmac::<Sha384>::new_from_slice(key)?;
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
            TokenAlgorithm::Hs512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(key)?;
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
        })
    }

    /// Constant-time signature check.
    fn signature_matches(&self, input: &[u8], signature: &[u8]) -> bool {
        let key = self.key();
        match self.algorithm {
            TokenAlgorithm::Hs256 => Hmac::<Sha256>::new_from_slice(key).is_ok_and(|mut mac| {
                mac.update(input);
                mac.verify_slice(signature).is_ok()
            }),
            TokenAlgorithm::Hs384 => Hmac::<Sha384>::new_from_slice(key).is_ok_and(|mut mac| {
                mac.update(input);
                mac.verify_slice(signature).is_ok()
            }),
            TokenAlgorithm::Hs512 => Hmac::<Sha512>::new_from_slice(key).is_ok_and(|mut mac| {
                mac.update(input);
                mac.verify_slice(signature).is_ok()
            }),
        }
    }

    /// Issue a token valid for `ttl` from now.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if encoding or signing fails.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<String, AuthError> {
        self.issue_at(identity, ttl, now_unix_seconds())
    }

    /// Issue a token valid for `ttl` from `now_unix_seconds`.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if encoding or signing fails.
    pub fn issue_at(
        &self,
        identity: &Identity,
        ttl: Duration,
        now_unix_seconds: i64,
    ) -> Result<String, AuthError> {
        let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            id: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            iat: now_unix_seconds,
            exp: now_unix_seconds.saturating_add(ttl_seconds),
        };
        let header = TokenHeader {
            alg: self.algorithm.as_str().to_string(),
            typ: "JWT".to_string(),
        };

        let signing_input = format!("{}.{}", b64e_json(&header)?, b64e_json(&claims)?);
        let signature = self.sign(signing_input.as_bytes()).map_err(|err| {
            error!("Failed to sign token: {err}");
            AuthError::Internal("token signing failed")
        })?;

        Ok(format!(
            "{signing_input}.{}",
            Base64UrlUnpadded::encode_string(&signature)
        ))
    }

    /// Verify a token against the current time.
    ///
    /// # Errors
    /// See [`TokenService::verify_at`].
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, now_unix_seconds())
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    /// - `TokenError::Malformed` if the token is not three base64url segments,
    ///   the header is not JSON, or the claims cannot be decoded;
    /// - `TokenError::InvalidSignature` if the algorithm differs from the
    ///   configured one or the signature does not verify;
    /// - `TokenError::Expired` if `exp` is not after `now_unix_seconds`.
    pub fn verify_at(&self, token: &str, now_unix_seconds: i64) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::Malformed)?;
        let claims_b64 = parts.next().ok_or(TokenError::Malformed)?;
        let signature_b64 = parts.next().ok_or(TokenError::Malformed)?;
        if parts.next().is_some() {
            return Err(TokenError::Malformed);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != self.algorithm.as_str() {
            return Err(TokenError::InvalidSignature);
        }

        let signature =
            Base64UrlUnpadded::decode_vec(signature_b64).map_err(|_| TokenError::Malformed)?;
        let signing_input = format!("{header_b64}.{claims_b64}");
        if !self.signature_matches(signing_input.as_bytes(), &signature) {
            return Err(TokenError::InvalidSignature);
        }

        let claims: Claims = b64d_json(claims_b64)?;
        if claims.exp <= now_unix_seconds {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
