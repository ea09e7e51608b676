use crate::{
    auth::{AuthConfig, TokenAlgorithm},
    cli::{
        actions::{server::Args, Action},
        commands::{self, auth},
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let jwt_secret = matches
        .get_one::<String>(auth::ARG_JWT_SECRET)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --jwt-secret")?;

    let mut config = AuthConfig::new().with_token_algorithm(
        matches
            .get_one::<TokenAlgorithm>(auth::ARG_JWT_ALGORITHM)
            .copied()
            .unwrap_or_default(),
    );
    if let Some(seconds) = matches.get_one::<u64>(auth::ARG_TOKEN_TTL_SECONDS) {
        config = config.with_token_ttl_seconds(*seconds);
    }
    if let Some(attempts) = matches.get_one::<u32>(auth::ARG_LOGIN_MAX_ATTEMPTS) {
        config = config.with_login_max_attempts(*attempts);
    }
    if let Some(seconds) = matches.get_one::<u64>(auth::ARG_LOGIN_COOLDOWN_SECONDS) {
        config = config.with_login_cooldown_seconds(*seconds);
    }
    if let Some(entries) = matches.get_one::<usize>(auth::ARG_THROTTLE_MAX_ENTRIES) {
        config = config.with_throttle_max_entries(*entries);
    }

    let frontend_origin = matches
        .get_one::<String>(commands::ARG_FRONTEND_ORIGIN)
        .cloned();

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret,
        auth: config,
        frontend_origin,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn builds_server_args() -> Result<()> {
        let matches = commands::new().try_get_matches_from(vec![
            "habitat",
            "--port",
            "9090",
            "--dsn",
            "postgres://localhost/habitat",
            "--jwt-secret",
            "0123456789abcdef0123456789abcdef",
            "--jwt-algorithm",
            "HS384",
            "--login-max-attempts",
            "5",
            "--frontend-origin",
            "https://app.habitat.dev",
        ])?;

        let Action::Server(args) = handler(&matches)?;
        assert_eq!(args.port, 9090);
        assert_eq!(args.dsn, "postgres://localhost/habitat");
        assert_eq!(
            args.jwt_secret.expose_secret(),
            "0123456789abcdef0123456789abcdef"
        );
        assert_eq!(args.auth.token_algorithm(), TokenAlgorithm::Hs384);
        assert_eq!(args.auth.throttle_policy().max_attempts, 5);
        assert_eq!(
            args.frontend_origin.as_deref(),
            Some("https://app.habitat.dev")
        );
        // The secret never shows up in debug output.
        assert!(!format!("{args:?}").contains("0123456789abcdef"));
        Ok(())
    }
}
