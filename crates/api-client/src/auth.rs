//! Request signing.
//!
//! Computes the `Authorization` header for non-anonymous services. The
//! rest of the crate only calls [`generate_auth_header`] and attaches the
//! result; none of the signing logic leaks into request handling.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Scheme token used in the `Authorization` header.
pub const AUTH_SCHEME: &str = "PKIT";

/// Compute the `Authorization` header value for a request.
///
/// The signature is an HMAC-SHA256 over the canonical signing string
/// `METHOD\nuri\ncontent-type\ndate`, keyed by the account password and
/// base64-encoded. The header renders as `PKIT <username>:<signature>`.
pub fn generate_auth_header(
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    content_type: &str,
    date: &str,
) -> String {
    let signing_string = format!(
        "{}\n{}\n{}\n{}",
        method.to_ascii_uppercase(),
        uri,
        content_type,
        date
    );

    // HMAC-SHA256 accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(password.as_bytes()).expect("hmac key");
    mac.update(signing_string.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    format!("{} {}:{}", AUTH_SCHEME, username, signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_carries_scheme_and_username() {
        let header = generate_auth_header(
            "alice",
            "secret",
            "GET",
            "/a/42/xml",
            "",
            "Thu, 01 Jan 2026 00:00:00 GMT",
        );
        assert!(header.starts_with("PKIT alice:"));
        assert!(header.len() > "PKIT alice:".len());
    }

    #[test]
    fn signature_is_deterministic_and_keyed() {
        let date = "Thu, 01 Jan 2026 00:00:00 GMT";
        let a = generate_auth_header("alice", "secret", "get", "/a", "", date);
        let b = generate_auth_header("alice", "secret", "GET", "/a", "", date);
        let c = generate_auth_header("alice", "other", "GET", "/a", "", date);
        // Method is canonicalized to upper case before signing.
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
