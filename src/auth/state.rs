//! Auth configuration.

use super::{throttle::ThrottlePolicy, token::TokenAlgorithm};
use std::time::Duration;

const DEFAULT_TOKEN_TTL_SECONDS: u64 = 60 * 60;
const DEFAULT_LOGIN_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_LOGIN_COOLDOWN_SECONDS: u64 = 5 * 60;
const DEFAULT_THROTTLE_MAX_ENTRIES: usize = 10_000;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    token_algorithm: TokenAlgorithm,
    token_ttl_seconds: u64,
    login_max_attempts: u32,
    login_cooldown_seconds: u64,
    throttle_max_entries: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token_algorithm: TokenAlgorithm::default(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            login_max_attempts: DEFAULT_LOGIN_MAX_ATTEMPTS,
            login_cooldown_seconds: DEFAULT_LOGIN_COOLDOWN_SECONDS,
            throttle_max_entries: DEFAULT_THROTTLE_MAX_ENTRIES,
        }
    }

    #[must_use]
    pub fn with_token_algorithm(mut self, algorithm: TokenAlgorithm) -> Self {
        self.token_algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_login_max_attempts(mut self, attempts: u32) -> Self {
        self.login_max_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_login_cooldown_seconds(mut self, seconds: u64) -> Self {
        self.login_cooldown_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_throttle_max_entries(mut self, entries: usize) -> Self {
        self.throttle_max_entries = entries.max(1);
        self
    }

    #[must_use]
    pub fn token_algorithm(&self) -> TokenAlgorithm {
        self.token_algorithm
    }

    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }

    #[must_use]
    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            max_attempts: self.login_max_attempts,
            cooldown: Duration::from_secs(self.login_cooldown_seconds),
            max_entries: self.throttle_max_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new();
        assert_eq!(config.token_algorithm(), TokenAlgorithm::Hs256);
        assert_eq!(config.token_ttl(), Duration::from_secs(3600));
        assert_eq!(
            config.throttle_policy(),
            ThrottlePolicy {
                max_attempts: 3,
                cooldown: Duration::from_secs(300),
                max_entries: 10_000,
            }
        );

        let config = config
            .with_token_algorithm(TokenAlgorithm::Hs512)
            .with_token_ttl_seconds(900)
            .with_login_max_attempts(5)
            .with_login_cooldown_seconds(60)
            .with_throttle_max_entries(0);

        assert_eq!(config.token_algorithm(), TokenAlgorithm::Hs512);
        assert_eq!(config.token_ttl(), Duration::from_secs(900));
        assert_eq!(config.throttle_policy().max_attempts, 5);
        assert_eq!(config.throttle_policy().cooldown, Duration::from_secs(60));
        assert_eq!(config.throttle_policy().max_entries, 1);
    }
}
