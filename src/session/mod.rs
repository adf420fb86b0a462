// Session lifecycle: tokens, renewal and the state the presentation layer observes
mod claims;
mod error;
mod manager;
mod provider;
mod renewal;
mod state;

pub use {
    claims::{TokenDecodeError, decode_claims},
    error::{AuthError, INVALID_CREDENTIALS_MESSAGE, SESSION_EXPIRED_MESSAGE},
    manager::SessionManager,
    provider::{SessionHandle, SessionProvider},
    renewal::renewal_delay,
    state::{SessionEvent, SessionState},
};
