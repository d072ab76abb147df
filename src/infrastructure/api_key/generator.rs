//! API key generation
//!
//! Generates the credential string, its display prefix, and the stored hash.

use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes in the secret segment (64 hex chars once encoded)
const SECRET_BYTES: usize = 32;
/// Random bytes in the prefix segment (8 hex chars once encoded)
const PREFIX_BYTES: usize = 4;
/// Characters of the prefix segment kept for display
const DISPLAY_PREFIX_LEN: usize = 8;

/// Result of generating a new API key
#[derive(Debug, Clone)]
pub struct GeneratedSecret {
    /// The full credential string (`sk_<8 hex>_<64 hex>`), shown once
    pub key: String,
    /// Truncated display fragment (`sk_a1b2c...`), safe to store and list
    pub display_prefix: String,
    /// Hex SHA-256 of the full credential, the only retained secret form
    pub hash: String,
}

/// Generator for API key credentials and record ids
#[derive(Debug, Clone, Default)]
pub struct ApiKeyGenerator;

impl ApiKeyGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh credential.
    ///
    /// The prefix segment is `sk_` plus 8 random hex chars; the secret
    /// segment is 64 random hex chars; the two are joined with `_`.
    pub fn generate(&self) -> GeneratedSecret {
        let prefix_segment = format!("sk_{}", random_hex(PREFIX_BYTES));
        let key = format!("{}_{}", prefix_segment, random_hex(SECRET_BYTES));

        let display_prefix = format!("{}...", &prefix_segment[..DISPLAY_PREFIX_LEN]);
        let hash = self.hash_key(&key);

        GeneratedSecret {
            key,
            display_prefix,
            hash,
        }
    }

    /// Hash a credential for storage or lookup
    pub fn hash_key(&self, key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    /// Synthesize a record id from the current time and random bytes.
    ///
    /// Collision avoidance, not a cryptographic uniqueness guarantee.
    pub fn new_id(&self) -> String {
        format!("{}-{}", Utc::now().timestamp_millis(), random_hex(4))
    }
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_format() {
        let generated = ApiKeyGenerator::new().generate();

        let segments: Vec<&str> = generated.key.split('_').collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], "sk");
        assert_eq!(segments[1].len(), 8);
        assert_eq!(segments[2].len(), 64);
        assert!(segments[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(segments[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_display_prefix_truncation() {
        let generated = ApiKeyGenerator::new().generate();

        assert!(generated.display_prefix.starts_with("sk_"));
        assert!(generated.display_prefix.ends_with("..."));
        assert_eq!(generated.display_prefix.len(), DISPLAY_PREFIX_LEN + 3);
        // the display fragment never contains the secret segment
        assert!(!generated.key.ends_with(generated.display_prefix.trim_end_matches("...")));
    }

    #[test]
    fn test_hash_is_hex_sha256_of_key() {
        let generator = ApiKeyGenerator::new();
        let generated = generator.generate();

        assert_eq!(generated.hash.len(), 64);
        assert_eq!(generated.hash, generator.hash_key(&generated.key));
    }

    #[test]
    fn test_hash_deterministic() {
        let generator = ApiKeyGenerator::new();

        assert_eq!(
            generator.hash_key("sk_a1b2c3d4_secret"),
            generator.hash_key("sk_a1b2c3d4_secret")
        );
        assert_ne!(
            generator.hash_key("sk_a1b2c3d4_secret"),
            generator.hash_key("sk_a1b2c3d4_secreu")
        );
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let generator = ApiKeyGenerator::new();
        let a = generator.generate();
        let b = generator.generate();

        assert_ne!(a.key, b.key);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_new_id_shape() {
        let id = ApiKeyGenerator::new().new_id();
        let (millis, rand_part) = id.split_once('-').unwrap();

        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(rand_part.len(), 8);
    }
}
