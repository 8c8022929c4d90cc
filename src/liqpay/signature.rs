//! LiqPay request signing.
//!
//! LiqPay signs with `base64(sha1(private_key + data + private_key))`. This is
//! not an HMAC, and it has to stay byte-for-byte compatible with the
//! provider's own verification.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha1::{Digest, Sha1};

/// base64(SHA-1(concatenation of `parts`)), no separators.
pub fn sign<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_ref());
    }
    STANDARD.encode(hasher.finalize())
}

/// Signature over `data` bookended by the private key.
pub fn sign_data(private_key: &str, data: &str) -> String {
    sign([private_key, data, private_key])
}

/// Recompute the signature of `data` and compare it with `signature`.
pub fn verify_data(private_key: &str, data: &str, signature: &str) -> bool {
    constant_time_compare(&sign_data(private_key, data), signature)
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_fixed_vector() {
        assert_eq!(sign(["s1", "s2", "s3"]), "TBTmgscUGvwjIW+lIEkXjOejKcc=");
    }

    #[test]
    fn test_sign_matches_digest_of_concatenation() {
        let expected = STANDARD.encode(Sha1::digest(b"s1s2s3"));
        assert_eq!(sign(["s1", "s2", "s3"]), expected);
        assert_eq!(sign(["s1s2", "s3"]), expected);
    }

    #[test]
    fn test_sign_is_order_sensitive() {
        assert_ne!(sign(["s1", "s2", "s3"]), sign(["s3", "s2", "s1"]));
    }

    #[test]
    fn test_sign_handles_non_ascii() {
        let first = sign(["ключ", "дані", "ключ"]);
        let second = sign(["ключ".as_bytes(), "дані".as_bytes(), "ключ".as_bytes()]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_verify_data() {
        let signature = sign_data("private", "eyJhIjoxfQ==");
        assert!(verify_data("private", "eyJhIjoxfQ==", &signature));
        assert!(!verify_data("other", "eyJhIjoxfQ==", &signature));
        assert!(!verify_data("private", "eyJhIjoyfQ==", &signature));
        assert!(!verify_data("private", "eyJhIjoxfQ==", ""));
    }
}
