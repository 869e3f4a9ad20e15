//! PBKDF2-HMAC-SHA256 password hashing: a per-user 128-bit random salt,
//! 100,000 iterations, hex-encoded storage.

use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const ITERATIONS: u32 = 100_000;
const SALT_BYTES: usize = 16;
const HASH_BYTES: usize = 32;

/// Generates a fresh 128-bit salt, hex-encoded.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Derives the PBKDF2-HMAC-SHA256 hash for `password` under `salt_hex`,
/// returning it hex-encoded.
pub fn derive(password: &str, salt_hex: &str) -> String {
    let salt = hex::decode(salt_hex).unwrap_or_default();
    let mut out = [0u8; HASH_BYTES];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), &salt, ITERATIONS, &mut out)
        .expect("HMAC can be initialized with any key length");
    hex::encode(out)
}

/// Constant-time comparison of a candidate password against a stored
/// hash/salt pair, so failed logins don't leak timing information about
/// how much of the hash matched.
pub fn verify(password: &str, salt_hex: &str, expected_hash_hex: &str) -> bool {
    let candidate = derive(password, salt_hex);
    let candidate_bytes = candidate.as_bytes();
    let expected_bytes = expected_hash_hex.as_bytes();
    if candidate_bytes.len() != expected_bytes.len() {
        return false;
    }
    candidate_bytes.ct_eq(expected_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let salt = generate_salt();
        let hash = derive("correct horse battery staple", &salt);
        assert!(verify("correct horse battery staple", &salt, &hash));
        assert!(!verify("wrong password", &salt, &hash));
    }

    #[test]
    fn salts_differ_between_calls() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
