//! Password scramble functions.
//!
//! Both challenge-response plugins hash the password with the server nonce so
//! that the password itself never crosses the wire.

use sha1::Sha1;
use sha2::{Digest, Sha256};

/// `mysql_native_password` response.
///
/// `SHA1(password) XOR SHA1(nonce + SHA1(SHA1(password)))`. An empty password
/// produces an empty response.
#[must_use]
pub fn scramble_native_password(password: &[u8], nonce: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let password_hash = Sha1::digest(password);
    let double_hash = Sha1::digest(password_hash);

    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(double_hash);
    let scramble_hash = hasher.finalize();

    xor(&password_hash, &scramble_hash)
}

/// `caching_sha2_password` fast-path response.
///
/// `SHA256(password) XOR SHA256(SHA256(SHA256(password)) + nonce)`. An empty
/// password produces an empty response.
#[must_use]
pub fn scramble_caching_sha2_password(password: &[u8], nonce: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let password_hash = Sha256::digest(password);
    let double_hash = Sha256::digest(password_hash);

    let mut hasher = Sha256::new();
    hasher.update(double_hash);
    hasher.update(nonce);
    let scramble_hash = hasher.finalize();

    xor(&password_hash, &scramble_hash)
}

/// Check a `mysql_native_password` response against the expected password
/// (server side).
#[must_use]
pub fn verify_native_password(response: &[u8], password: &[u8], nonce: &[u8]) -> bool {
    scramble_native_password(password, nonce) == response
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONCE: &[u8; 20] = b"\x3d\x4c\x2a\x6b\x14\x7f\x01\x58\x27\x29\x52\x06\x4e\x1b\x5c\x3a\x70\x43\x1d\x0e";

    #[test]
    fn test_native_length_and_determinism() {
        let a = scramble_native_password(b"secret", NONCE);
        let b = scramble_native_password(b"secret", NONCE);
        assert_eq!(a.len(), 20);
        assert_eq!(a, b);
        assert_ne!(a, scramble_native_password(b"secret", &[0; 20]));
    }

    #[test]
    fn test_native_reversible_with_stored_hash() {
        // The server stores SHA1(SHA1(pw)) and recovers SHA1(pw) from the
        // response; check the algebra holds.
        let response = scramble_native_password(b"secret", NONCE);
        let stored = Sha1::digest(Sha1::digest(b"secret"));
        let mut hasher = Sha1::new();
        hasher.update(NONCE);
        hasher.update(stored);
        let recovered = xor(&response, &hasher.finalize());
        assert_eq!(Sha1::digest(&recovered).as_slice(), stored.as_slice());
    }

    #[test]
    fn test_caching_sha2_length() {
        assert_eq!(scramble_caching_sha2_password(b"secret", NONCE).len(), 32);
    }

    #[test]
    fn test_empty_password() {
        assert!(scramble_native_password(b"", NONCE).is_empty());
        assert!(scramble_caching_sha2_password(b"", NONCE).is_empty());
        assert!(verify_native_password(&[], b"", NONCE));
    }

    #[test]
    fn test_verify() {
        let response = scramble_native_password(b"pw", NONCE);
        assert!(verify_native_password(&response, b"pw", NONCE));
        assert!(!verify_native_password(&response, b"other", NONCE));
    }
}
