use crate::auth::TokenAlgorithm;
use clap::{builder::ValueParser, Arg, Command};

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_ALGORITHM: &str = "jwt-algorithm";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_LOGIN_MAX_ATTEMPTS: &str = "login-max-attempts";
pub const ARG_LOGIN_COOLDOWN_SECONDS: &str = "login-cooldown-seconds";
pub const ARG_THROTTLE_MAX_ENTRIES: &str = "throttle-max-entries";

#[must_use]
pub fn validator_algorithm() -> ValueParser {
    ValueParser::from(|value: &str| value.parse::<TokenAlgorithm>())
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long("jwt-secret")
                .help("Secret used to sign session tokens (at least 32 bytes)")
                .env("HABITAT_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_ALGORITHM)
                .long("jwt-algorithm")
                .help("Token signing algorithm: HS256, HS384, HS512")
                .env("HABITAT_JWT_ALGORITHM")
                .default_value("HS256")
                .value_parser(validator_algorithm()),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long("token-ttl-seconds")
                .help("Session token lifetime in seconds")
                .env("HABITAT_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOGIN_MAX_ATTEMPTS)
                .long("login-max-attempts")
                .help("Failed logins before an email is locked")
                .env("HABITAT_LOGIN_MAX_ATTEMPTS")
                .default_value("3")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOGIN_COOLDOWN_SECONDS)
                .long("login-cooldown-seconds")
                .help("Lock duration in seconds, counted from the first failure")
                .env("HABITAT_LOGIN_COOLDOWN_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_THROTTLE_MAX_ENTRIES)
                .long("throttle-max-entries")
                .help("Maximum number of emails tracked by the login throttle")
                .env("HABITAT_THROTTLE_MAX_ENTRIES")
                .default_value("10000")
                .value_parser(clap::value_parser!(usize)),
        )
}
