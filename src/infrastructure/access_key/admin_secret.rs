//! Administrative credential

use subtle::ConstantTimeEq;

use crate::domain::DomainError;

/// Shared secret that gates key issuance
///
/// The value never appears in `Debug` output.
#[derive(Clone)]
pub struct AdminSecret(String);

impl AdminSecret {
    /// Wrap a secret, rejecting empty or whitespace-only values
    ///
    /// Surrounding whitespace is dropped, as it is from presented credentials.
    pub fn new(secret: impl Into<String>) -> Result<Self, DomainError> {
        let secret = secret.into();
        let trimmed = secret.trim();

        if trimmed.is_empty() {
            return Err(DomainError::configuration("Admin secret cannot be empty"));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Compare a presented credential in constant time
    pub fn verify(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl std::fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminSecret([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        let secret = AdminSecret::new("s3cret").unwrap();

        assert!(secret.verify("s3cret"));
        assert!(!secret.verify("s3cre"));
        assert!(!secret.verify("s3cret!"));
        assert!(!secret.verify(""));
    }

    #[test]
    fn test_secret_is_trimmed() {
        let secret = AdminSecret::new("  s3cret\n").unwrap();

        assert!(secret.verify("s3cret"));
        assert!(!secret.verify("  s3cret\n"));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(AdminSecret::new("").is_err());
        assert!(AdminSecret::new("   ").is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let secret = AdminSecret::new("hunter2").unwrap();
        let debug = format!("{:?}", secret);

        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }
}
