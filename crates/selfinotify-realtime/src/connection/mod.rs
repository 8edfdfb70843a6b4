//! Connection lifecycle: handles and authentication.

pub mod authenticator;
pub mod handle;
