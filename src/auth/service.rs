//! Login, registration and request token verification.
//!
//! Flow Overview (login):
//! 1) Normalize the email and reserve an attempt with the throttle; locked
//!    emails stop here.
//! 2) Look the account up and verify the password off the async runtime.
//!    Unknown emails are verified against a dummy hash.
//! 3) On failure count the attempt; on success clear it and issue a token.
//!
//! The throttle lock is never held while the store or the hasher runs. The
//! reservation is, so concurrent guesses for one email share its budget.

use super::{
    clock::Clock,
    password,
    state::AuthConfig,
    throttle::ThrottleTracker,
    token::{Claims, Identity, TokenService},
    AuthError,
};
use crate::store::{NewAccount, Role, Store, StoreError};
use anyhow::Result;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use utoipa::ToSchema;

pub const TOKEN_TYPE: &str = "bearer";

/// Normalize an email for lookups, uniqueness and throttling.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub token: String,
    pub token_type: String,
    /// Frontend route for the user's role.
    pub redirect: String,
}

pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

pub struct Authenticator {
    config: AuthConfig,
    tokens: TokenService,
    throttle: ThrottleTracker,
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

fn store_failure(err: &StoreError) -> AuthError {
    error!("Account store failure: {err}");
    AuthError::Internal("account store unavailable")
}

impl Authenticator {
    /// # Errors
    /// Returns an error if the signing secret is too short.
    pub fn new(
        config: AuthConfig,
        secret: SecretString,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let tokens = TokenService::new(secret, config.token_algorithm())?;
        Ok(Self::with_token_service(config, tokens, store, clock))
    }

    /// Build from an already validated [`TokenService`].
    #[must_use]
    pub fn with_token_service(
        config: AuthConfig,
        tokens: TokenService,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let throttle = ThrottleTracker::new(config.throttle_policy());
        Self {
            config,
            tokens,
            throttle,
            store,
            clock,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub fn throttle(&self) -> &ThrottleTracker {
        &self.throttle
    }

    /// Hash the password and create the account.
    ///
    /// # Errors
    /// `AuthError::EmailTaken` if the email exists, `AuthError::Internal` on
    /// hashing or store failures.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<i64, AuthError> {
        let email = normalize_email(&registration.email);
        let password_hash = password::hash_blocking(registration.password).await?;

        match self
            .store
            .insert_account(NewAccount {
                name: registration.name.trim().to_string(),
                email,
                password_hash,
                role: registration.role,
            })
            .await
        {
            Ok(id) => {
                debug!("Account {id} registered");
                Ok(id)
            }
            Err(StoreError::Conflict) => Err(AuthError::EmailTaken),
            Err(err) => Err(store_failure(&err)),
        }
    }

    /// Check credentials and issue a session token.
    ///
    /// # Errors
    /// - `AuthError::TooManyAttempts` while the email is locked; the store and
    ///   the hasher are not consulted;
    /// - `AuthError::InvalidCredentials` for an unknown email or wrong password;
    /// - `AuthError::Internal` on store, hashing or signing failures.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let key = normalize_email(email);

        let permit = match self.throttle.acquire(&key, self.clock.now_unix_seconds()) {
            Ok(permit) => permit,
            Err(retry_after_seconds) => {
                warn!(retry_after_seconds, "Login refused, too many failed attempts");
                return Err(AuthError::TooManyAttempts {
                    retry_after_seconds,
                });
            }
        };

        // Dropping the permit on an early return releases the reservation.
        let account = self
            .store
            .find_account_by_email(&key)
            .await
            .map_err(|err| store_failure(&err))?;

        let verified = match &account {
            Some(account) => {
                password::verify_blocking(password.to_string(), account.password_hash.clone())
                    .await?
            }
            None => password::verify_dummy_blocking(password.to_string()).await?,
        };

        let Some(account) = account.filter(|_| verified) else {
            let state = permit.fail(self.clock.now_unix_seconds());
            warn!(?state, "Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        permit.succeed();

        let identity = Identity {
            id: account.id,
            email: account.email,
            role: account.role,
        };
        let token =
            self.tokens
                .issue_at(&identity, self.config.token_ttl(), self.clock.now_unix_seconds())?;

        debug!("Login successful for account {}", identity.id);

        Ok(LoginOutcome {
            token,
            token_type: TOKEN_TYPE.to_string(),
            redirect: identity.role.redirect_hint().to_string(),
        })
    }

    /// Verify a bearer token and return its claims.
    ///
    /// # Errors
    /// `AuthError::Token` with the reason the token was refused.
    pub fn verify_request_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens
            .verify_at(token, self.clock.now_unix_seconds())
            .map_err(|err| {
                debug!("Token rejected: {err}");
                AuthError::Token(err)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{clock::ManualClock, TokenError};
    use crate::store::memory::MemoryStore;

    const SECRET: &str = "test-secret-test-secret-test-secret";
    const NOW: i64 = 1_700_000_000;

    struct Fixture {
        auth: Authenticator,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Result<Fixture> {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let auth = Authenticator::new(
            AuthConfig::new(),
            SecretString::from(SECRET.to_string()),
            store.clone(),
            clock.clone(),
        )?;
        Ok(Fixture { auth, store, clock })
    }

    fn registration(email: &str, password: &str, role: Role) -> Registration {
        Registration {
            name: "Alice".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn register_login_lockout_and_recovery() -> Result<()> {
        let Fixture { auth, store, clock } = fixture()?;
        let id = auth
            .register(registration("a@x.com", "secret123", Role::Normal))
            .await?;

        let outcome = auth.login("a@x.com", "secret123").await?;
        assert_eq!(outcome.token_type, "bearer");
        assert_eq!(outcome.redirect, "/dashboard");
        let claims = auth.verify_request_token(&outcome.token)?;
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.id, id);
        assert_eq!(claims.role, Role::Normal);

        for _ in 0..3 {
            assert_eq!(
                auth.login("a@x.com", "wrong").await,
                Err(AuthError::InvalidCredentials)
            );
        }

        let lookups = store.email_lookups();
        let locked = auth.login("a@x.com", "secret123").await;
        assert!(matches!(locked, Err(AuthError::TooManyAttempts { .. })));
        assert_eq!(store.email_lookups(), lookups, "store consulted while locked");

        clock.advance(5 * 60);
        let outcome = auth.login("a@x.com", "secret123").await?;
        assert_eq!(auth.verify_request_token(&outcome.token)?.email, "a@x.com");
        Ok(())
    }

    #[tokio::test]
    async fn success_before_third_failure_resets() -> Result<()> {
        let Fixture { auth, .. } = fixture()?;
        auth.register(registration("a@x.com", "secret123", Role::Normal))
            .await?;

        for _ in 0..2 {
            assert!(auth.login("a@x.com", "wrong").await.is_err());
        }
        auth.login("a@x.com", "secret123").await?;
        for _ in 0..2 {
            assert_eq!(
                auth.login("a@x.com", "wrong").await,
                Err(AuthError::InvalidCredentials)
            );
        }
        auth.login("a@x.com", "secret123").await?;
        Ok(())
    }

    #[tokio::test]
    async fn unknown_email_matches_wrong_password() -> Result<()> {
        let Fixture { auth, .. } = fixture()?;
        auth.register(registration("a@x.com", "secret123", Role::Normal))
            .await?;

        let unknown = auth.login("nobody@x.com", "secret123").await;
        let wrong = auth.login("a@x.com", "nope").await;
        assert_eq!(unknown, Err(AuthError::InvalidCredentials));
        assert_eq!(unknown, wrong);

        for _ in 0..2 {
            let _ = auth.login("nobody@x.com", "secret123").await;
        }
        assert!(matches!(
            auth.login("nobody@x.com", "secret123").await,
            Err(AuthError::TooManyAttempts { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn email_is_normalized() -> Result<()> {
        let Fixture { auth, .. } = fixture()?;
        auth.register(registration(" A@X.com ", "secret123", Role::Admin))
            .await?;
        let outcome = auth.login("a@x.COM", "secret123").await?;
        assert_eq!(outcome.redirect, "/admin");

        assert_eq!(
            auth.register(registration("a@x.com", "other", Role::Normal))
                .await,
            Err(AuthError::EmailTaken)
        );
        Ok(())
    }

    #[tokio::test]
    async fn tokens_expire_with_the_clock() -> Result<()> {
        let Fixture { auth, clock, .. } = fixture()?;
        auth.register(registration("a@x.com", "secret123", Role::Normal))
            .await?;
        let outcome = auth.login("a@x.com", "secret123").await?;

        clock.advance(59 * 60);
        assert!(auth.verify_request_token(&outcome.token).is_ok());
        clock.advance(60);
        assert_eq!(
            auth.verify_request_token(&outcome.token),
            Err(AuthError::Token(TokenError::Expired))
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_wrong_logins_are_bounded() -> Result<()> {
        let Fixture { auth, store, .. } = fixture()?;
        auth.register(registration("a@x.com", "secret123", Role::Normal))
            .await?;
        let auth = Arc::new(auth);
        let lookups = store.email_lookups();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let auth = Arc::clone(&auth);
                tokio::spawn(async move { auth.login("a@x.com", "wrong").await })
            })
            .collect();

        let mut rejected = 0;
        let mut throttled = 0;
        for handle in handles {
            match handle.await? {
                Err(AuthError::InvalidCredentials) => rejected += 1,
                Err(AuthError::TooManyAttempts { .. }) => throttled += 1,
                other => panic!("unexpected login result: {other:?}"),
            }
        }

        assert_eq!(rejected, 3);
        assert_eq!(throttled, 17);
        assert!(store.email_lookups() - lookups <= 3);
        assert!(matches!(
            auth.login("a@x.com", "secret123").await,
            Err(AuthError::TooManyAttempts { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn store_failures_do_not_count_or_hold_attempts() -> Result<()> {
        let Fixture { auth, store, .. } = fixture()?;
        auth.register(registration("a@x.com", "secret123", Role::Normal))
            .await?;

        store.set_unavailable(true);
        for _ in 0..5 {
            assert!(matches!(
                auth.login("a@x.com", "secret123").await,
                Err(AuthError::Internal(_))
            ));
        }
        assert!(auth.throttle().is_empty());

        store.set_unavailable(false);
        for _ in 0..2 {
            assert_eq!(
                auth.login("a@x.com", "wrong").await,
                Err(AuthError::InvalidCredentials)
            );
        }
        auth.login("a@x.com", "secret123").await?;
        Ok(())
    }

    #[test]
    fn short_secret_fails_construction() {
        let result = Authenticator::new(
            AuthConfig::new(),
            SecretString::from("too-short".to_string()),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(NOW)),
        );
        assert!(result.is_err());
    }
}
