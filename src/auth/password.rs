//! Password hashing and verification using Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$<salt>$<digest>`), so
//! the algorithm parameters and salt travel with the digest.

use super::AuthError;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use std::sync::OnceLock;
use tokio::task;
use tracing::error;

/// Hash a password with a fresh random salt.
///
/// # Errors
/// Returns `AuthError::Internal` if hashing fails. The error never contains the
/// password.
pub fn hash(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            error!("Password hashing failed: {err}");
            AuthError::Internal("password hashing failed")
        })
}

/// Check a password against a stored PHC string in constant time.
///
/// Malformed hashes simply don't match.
#[must_use]
pub fn verify(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        error!("Stored password hash is not a valid PHC string");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// A PHC string that no client password matches, hashed with the same
/// parameters as real accounts. Logins for unknown emails verify against it so
/// they cost as much as a wrong password.
///
/// Computed once per process. If hashing fails the empty string is returned,
/// which [`verify`] rejects.
#[must_use]
pub fn dummy_hash() -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| {
        let secret = SaltString::generate(&mut OsRng);
        hash(secret.as_str()).unwrap_or_default()
    })
}

/// [`hash`] on the blocking pool.
///
/// # Errors
/// Returns `AuthError::Internal` if hashing fails or the task is cancelled.
pub async fn hash_blocking(password: String) -> Result<String, AuthError> {
    task::spawn_blocking(move || hash(&password))
        .await
        .map_err(|err| {
            error!("Password hashing task failed: {err}");
            AuthError::Internal("password hashing failed")
        })?
}

/// [`verify`] on the blocking pool.
///
/// # Errors
/// Returns `AuthError::Internal` if the task is cancelled.
pub async fn verify_blocking(password: String, password_hash: String) -> Result<bool, AuthError> {
    task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|err| {
            error!("Password verification task failed: {err}");
            AuthError::Internal("password verification failed")
        })
}

/// [`verify`] against [`dummy_hash`] on the blocking pool. Always `false`.
///
/// # Errors
/// Returns `AuthError::Internal` if the task is cancelled.
pub async fn verify_dummy_blocking(password: String) -> Result<bool, AuthError> {
    task::spawn_blocking(move || {
        let _ = verify(&password, dummy_hash());
        false
    })
    .await
    .map_err(|err| {
        error!("Password verification task failed: {err}");
        AuthError::Internal("password verification failed")
    })
}
