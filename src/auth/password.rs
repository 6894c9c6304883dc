//! Salted password hashing.
//!
//! The digest is SHA-512 over `password || salt`, base64url encoded with
//! padding. Changing the concatenation order or the encoding invalidates
//! every stored credential.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rand::RngCore;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::types::PasswordHash;

/// Salt length in bytes.
pub const SALT_BYTES: usize = 16;

/// Salt used to burn the same hashing cost when the username is unknown.
pub(crate) const DUMMY_SALT: [u8; SALT_BYTES] = [0u8; SALT_BYTES];

/// Hash a password with the given salt.
pub fn hash_password(password: &str, salt: &[u8; SALT_BYTES]) -> PasswordHash {
    let mut hasher = Sha512::new();
    hasher.update(password.as_bytes());
    hasher.update(salt);
    PasswordHash::new(URL_SAFE.encode(hasher.finalize()))
}

/// Generate a fresh random salt.
pub fn generate_salt() -> [u8; SALT_BYTES] {
    let mut salt = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Constant-time byte comparison.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Check a password attempt against a stored hash.
pub fn verify_password(password: &str, salt: &[u8; SALT_BYTES], expected: &PasswordHash) -> bool {
    let attempt = hash_password(password, salt);
    constant_time_eq(attempt.as_str().as_bytes(), expected.as_str().as_bytes())
}
