/// API key credential helpers
///
/// Generates API keys and turns them into the salted hash that is persisted
/// in `api_keys.key_hash`. Persistence itself lives in
/// [`crate::models::api_key`].
///
/// # Key Format
///
/// `bc_` followed by 40 base62 characters (43 chars total). The first 8
/// characters are stored in clear as the display prefix.
///
/// # Storage
///
/// Keys are hashed with Argon2id and a random salt, in PHC string format
/// (`$argon2id$v=19$...`). The same key hashed twice gives two different
/// strings; use [`verify_api_key`] to check a candidate.
///
/// # Example
///
/// ```
/// use basecamp_shared::auth::api_key::{generate_api_key, verify_api_key};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let generated = generate_api_key()?;
/// assert!(generated.key.starts_with("bc_"));
/// assert_eq!(generated.prefix.len(), 8);
/// assert!(verify_api_key(&generated.key, &generated.hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;

/// Leading marker of every key
pub const KEY_MARKER: &str = "bc_";

/// Number of random characters after the marker
const KEY_RANDOM_LENGTH: usize = 40;

/// Total length of an API key
pub const API_KEY_LENGTH: usize = KEY_MARKER.len() + KEY_RANDOM_LENGTH;

/// Number of leading characters kept in clear
pub const KEY_PREFIX_LENGTH: usize = 8;

/// Error type for API key hashing
#[derive(Debug, thiserror::Error)]
pub enum ApiKeyError {
    /// Hashing failed
    #[error("Failed to hash API key: {0}")]
    Hash(String),

    /// The stored hash is not a valid PHC string
    #[error("Invalid API key hash: {0}")]
    InvalidHash(String),
}

/// A freshly generated key
///
/// `key` is the only copy of the plaintext; it is shown to the user once and
/// then dropped.
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    /// Plaintext key
    pub key: String,

    /// Display prefix (first 8 characters)
    pub prefix: String,

    /// Argon2id PHC string
    pub hash: String,
}

/// Generates a new random API key together with its prefix and hash
pub fn generate_api_key() -> Result<GeneratedApiKey, ApiKeyError> {
    let key = format!("{KEY_MARKER}{}", random_base62(KEY_RANDOM_LENGTH));
    let hash = hash_api_key(&key)?;

    Ok(GeneratedApiKey {
        prefix: key_prefix(&key).to_string(),
        key,
        hash,
    })
}

fn random_base62(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Display prefix of a key
pub fn key_prefix(key: &str) -> &str {
    match key.char_indices().nth(KEY_PREFIX_LENGTH) {
        Some((end, _)) => &key[..end],
        None => key,
    }
}

/// Hashes a key with Argon2id and a random salt
pub fn hash_api_key(key: &str) -> Result<String, ApiKeyError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(key.as_bytes(), &salt)
        .map_err(|e| ApiKeyError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Checks a plaintext key against a stored hash
///
/// Returns `Ok(false)` for a wrong key and an error only when the stored
/// hash cannot be parsed.
pub fn verify_api_key(key: &str, hash: &str) -> Result<bool, ApiKeyError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ApiKeyError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(key.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiKeyError::InvalidHash(e.to_string())),
    }
}

/// Checks that a string looks like a key this module generated
pub fn validate_api_key_format(key: &str) -> bool {
    key.len() == API_KEY_LENGTH
        && key.starts_with(KEY_MARKER)
        && key[KEY_MARKER.len()..].chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_format() {
        let generated = generate_api_key().unwrap();

        assert_eq!(generated.key.len(), 43);
        assert!(generated.key.starts_with("bc_"));
        assert!(validate_api_key_format(&generated.key));
        assert_eq!(generated.prefix, &generated.key[..8]);
        assert!(generated.hash.starts_with("$argon2id$"));
        assert!(!generated.hash.contains(&generated.key));
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let a = generate_api_key().unwrap();
        let b = generate_api_key().unwrap();
        assert_ne!(a.key, b.key);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_hash_is_salted() {
        let key = "bc_0123456789abcdefghijABCDEFGHIJ0123456789";
        let first = hash_api_key(key).unwrap();
        let second = hash_api_key(key).unwrap();

        assert_ne!(first, second);
        assert!(verify_api_key(key, &first).unwrap());
        assert!(verify_api_key(key, &second).unwrap());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let generated = generate_api_key().unwrap();
        assert!(!verify_api_key("bc_wrong", &generated.hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let result = verify_api_key("bc_anything", "not-a-phc-string");
        assert!(matches!(result, Err(ApiKeyError::InvalidHash(_))));
    }

    #[test]
    fn test_format_validation() {
        assert!(!validate_api_key_format("bc_short"));
        assert!(!validate_api_key_format(&format!("xx_{}", "a".repeat(40))));
        assert!(!validate_api_key_format(&format!("bc_{}!", "a".repeat(39))));
        assert!(validate_api_key_format(&format!("bc_{}", "a".repeat(40))));
    }

    #[test]
    fn test_key_prefix_of_short_input() {
        assert_eq!(key_prefix("bc_ab"), "bc_ab");
        assert_eq!(key_prefix("bc_abcdefgh"), "bc_abcde");
    }
}
