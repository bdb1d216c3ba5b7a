//! Webhook signature helpers shared by gateway implementations.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Hex-encoded HMAC-SHA512 of `body` under `secret`.
pub fn hmac_sha512_hex(secret: &[u8], body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let Ok(mut mac) = HmacSha512::new_from_slice(secret) else {
        return String::new();
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Compare a received hex signature against the expected one in constant
/// time. Case-insensitive; empty or malformed input never matches.
pub fn hex_signature_matches(expected_hex: &str, received_hex: &str) -> bool {
    let (Ok(expected), Ok(received)) = (
        hex::decode(expected_hex.trim()),
        hex::decode(received_hex.trim()),
    ) else {
        return false;
    };
    if expected.is_empty() {
        return false;
    }
    expected.ct_eq(&received).into()
}

/// Verify a hex HMAC-SHA512 signature over `body`.
pub fn verify_hmac_sha512(secret: &[u8], body: &[u8], received_hex: &str) -> bool {
    hex_signature_matches(&hmac_sha512_hex(secret, body), received_hex)
}
