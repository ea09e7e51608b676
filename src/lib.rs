//! # Habitat (hamster habitat monitoring API)
//!
//! `habitat` is the backend for a hamster habitat monitoring service. It
//! registers users, devices and hamsters, stores temperature/humidity readings
//! reported by habitat sensors, and authenticates users with bearer tokens.
//!
//! ## Authentication
//!
//! - **Passwords** are stored as Argon2id PHC strings, never in plaintext.
//! - **Tokens** are HMAC-signed JWTs carrying `{id, email, role, iat, exp}`.
//!   They are stateless; there is no revocation list, tokens simply expire.
//! - **Throttling:** 3 consecutive failed logins for the same email lock that
//!   email for 5 minutes counted from the first failure. Locked attempts are
//!   rejected before the password is even checked.
//!
//! The signing secret is mandatory configuration; the server refuses to start
//! without it.

pub mod auth;
pub mod cli;
pub mod habitat;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }
}
