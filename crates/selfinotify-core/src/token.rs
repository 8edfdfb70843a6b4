//! Application token generation.
//!
//! A token is the opaque channel identifier for one application. It is
//! globally unique and only ever replaced through explicit regeneration.

use std::fmt::Write as _;

use rand::RngCore;

/// Prefix carried by every application token.
pub const TOKEN_PREFIX: &str = "app_";

/// Number of random bytes in a token.
const TOKEN_BYTES: usize = 32;

/// Generate a fresh application token: `app_` followed by 64 hex chars.
pub fn generate_app_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let mut token = String::with_capacity(TOKEN_PREFIX.len() + TOKEN_BYTES * 2);
    token.push_str(TOKEN_PREFIX);
    for b in bytes {
        let _ = write!(token, "{b:02x}");
    }
    token
}

/// Check whether a string looks like a well-formed application token.
pub fn is_well_formed(token: &str) -> bool {
    token
        .strip_prefix(TOKEN_PREFIX)
        .is_some_and(|rest| rest.len() == TOKEN_BYTES * 2 && rest.bytes().all(|b| b.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_well_formed() {
        let token = generate_app_token();
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(token.len(), TOKEN_PREFIX.len() + TOKEN_BYTES * 2);
        assert!(is_well_formed(&token));
    }

    #[test]
    fn generated_tokens_are_unique() {
        let a = generate_app_token();
        let b = generate_app_token();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(!is_well_formed("tok_abc"));
        assert!(!is_well_formed("app_short"));
        assert!(!is_well_formed(""));
    }
}
