//! Authentication: password hashing, session tokens and login throttling.
//!
//! [`Authenticator`] ties the pieces together and is shared by the HTTP layer
//! as `Arc<Authenticator>`. Handlers authenticate callers through the
//! [`Principal`] extractor.

mod clock;
mod error;
pub mod password;
mod principal;
mod service;
mod state;
pub mod throttle;
pub mod token;

pub use clock::{Clock, SystemClock};
pub use error::{AuthError, TokenError};
pub use principal::Principal;
pub use service::{normalize_email, Authenticator, LoginOutcome, Registration, TOKEN_TYPE};
pub use state::AuthConfig;
pub use throttle::{ThrottlePermit, ThrottlePolicy, ThrottleState, ThrottleTracker};
pub use token::{Claims, Identity, TokenAlgorithm, TokenService, MIN_SECRET_LENGTH};

#[cfg(test)]
pub(crate) use clock::ManualClock;
