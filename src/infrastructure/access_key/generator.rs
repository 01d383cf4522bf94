//! Access key generation
//!
//! Keys look like `KEY-9F2C41AB-03D7E6C2-5A1B88F0-C4D2E917`: a readable
//! prefix followed by the random bytes as upper-case hex in 4-byte groups.

use rand::RngCore;

use crate::domain::DomainError;

/// Lower bound on key entropy (64 bits)
pub const MIN_KEY_BYTES: usize = 8;

/// Default key entropy (128 bits)
pub const DEFAULT_KEY_BYTES: usize = 16;

const GROUP_BYTES: usize = 4;

/// Generator for opaque access keys
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    /// Readable prefix, e.g. "KEY"
    prefix: String,
    /// Number of random bytes per key
    key_bytes: usize,
}

impl KeyGenerator {
    /// Create a generator with the default entropy
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            key_bytes: DEFAULT_KEY_BYTES,
        }
    }

    /// Set the number of random bytes, refusing anything under 64 bits
    pub fn with_key_bytes(mut self, bytes: usize) -> Result<Self, DomainError> {
        if bytes < MIN_KEY_BYTES {
            return Err(DomainError::configuration(format!(
                "Keys need at least {} random bytes, got {}",
                MIN_KEY_BYTES, bytes
            )));
        }

        self.key_bytes = bytes;
        Ok(self)
    }

    /// Generate a new key string
    pub fn generate(&self) -> String {
        let mut random_bytes = vec![0u8; self.key_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        self.format_key(&random_bytes)
    }

    fn format_key(&self, random_bytes: &[u8]) -> String {
        let groups: Vec<String> = random_bytes
            .chunks(GROUP_BYTES)
            .map(hex::encode_upper)
            .collect();

        if self.prefix.is_empty() {
            groups.join("-")
        } else {
            format!("{}-{}", self.prefix, groups.join("-"))
        }
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new("KEY")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_key_format() {
        let generator = KeyGenerator::new("KEY");
        let key = generator.generate();

        let parts: Vec<&str> = key.split('-').collect();
        assert_eq!(parts[0], "KEY");
        assert_eq!(parts.len(), 1 + DEFAULT_KEY_BYTES / GROUP_BYTES);

        for group in &parts[1..] {
            assert_eq!(group.len(), 8);
            assert!(group.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_format_known_bytes() {
        let generator = KeyGenerator::new("ABC");
        let key = generator.format_key(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02, 0x03, 0xff]);

        assert_eq!(key, "ABC-DEADBEEF-00010203-FF");
    }

    #[test]
    fn test_empty_prefix() {
        let generator = KeyGenerator::new("");
        let key = generator.format_key(&[1, 2, 3, 4, 5, 6, 7, 8]);

        assert_eq!(key, "01020304-05060708");
    }

    #[test]
    fn test_minimum_entropy_enforced() {
        assert!(KeyGenerator::new("KEY").with_key_bytes(7).is_err());

        let generator = KeyGenerator::new("KEY").with_key_bytes(8).unwrap();
        assert_eq!(generator.generate().len(), "KEY-".len() + 8 + 1 + 8);
    }

    #[test]
    fn test_key_uniqueness() {
        let generator = KeyGenerator::default();
        let keys: HashSet<String> = (0..1000).map(|_| generator.generate()).collect();

        assert_eq!(keys.len(), 1000);
    }
}
