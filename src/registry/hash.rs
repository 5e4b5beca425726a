// Identifier hashing
// External identifiers are never stored in plaintext; the mapping store
// is keyed by a slow, salted PBKDF2-SHA512 digest. Iteration count,
// output length, and digest are fixed: registration and lookup must hash
// identically or lookups silently miss.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;

/// PBKDF2 iteration count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derived key length in bytes
pub const PBKDF2_KEY_LEN: usize = 64;

/// Derive the mapping-store key for an external identifier
///
/// Returns the derived key as lowercase hex (128 characters).
pub fn hashed_key(external_id: &str, salt: &str) -> String {
    let mut derived = [0u8; PBKDF2_KEY_LEN];
    pbkdf2_hmac::<Sha512>(
        external_id.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut derived,
    );
    hex::encode(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_key_deterministic() {
        let a = hashed_key("1234567890123", "salt");
        let b = hashed_key("1234567890123", "salt");
        assert_eq!(a, b);
        assert_eq!(a.len(), PBKDF2_KEY_LEN * 2);
    }

    #[test]
    fn test_hashed_key_depends_on_id_and_salt() {
        let base = hashed_key("1234567890123", "salt");
        assert_ne!(base, hashed_key("1234567890124", "salt"));
        assert_ne!(base, hashed_key("1234567890123", "other-salt"));
    }

    #[test]
    fn test_hashed_key_hides_plaintext() {
        let key = hashed_key("1234567890123", "salt");
        assert!(!key.contains("1234567890123"));
    }
}
