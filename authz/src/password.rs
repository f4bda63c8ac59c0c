//! Credential hashing for owner secrets.
//!
//! Every stored secret is an argon2id digest in PHC string format. The salt
//! and cost parameters travel inside the digest, so verification only needs
//! the digest itself.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, DenyReason, Result};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 4;

/// A one-way digest of an owner secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Wraps a digest read back from storage.
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CredentialHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hashes and verifies owner secrets.
///
/// Implementations must never panic on a malformed digest; `verify` answers
/// `false` instead.
pub trait CredentialHasher: Send + Sync {
    /// Produces a digest for `secret`.
    fn hash(&self, secret: &str) -> Result<CredentialHash>;

    /// Returns true iff `secret` matches `digest`.
    fn verify(&self, secret: &str, digest: &CredentialHash) -> bool;
}

/// argon2id hasher used for all stored secrets.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Creates a hasher with the argon2 crate's recommended parameters.
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Creates a hasher with explicit cost parameters.
    ///
    /// `memory_kib` is the memory cost in KiB, `iterations` the time cost and
    /// `parallelism` the lane count.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthzError::Hashing(format!("Invalid argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    /// Cheapest parameters argon2 accepts. Only meant for tests and tooling.
    pub fn fast_insecure() -> Self {
        Self {
            params: Params::new(
                Params::MIN_M_COST,
                Params::MIN_T_COST,
                Params::MIN_P_COST,
                None,
            )
            .unwrap_or_default(),
        }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<CredentialHash> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AuthzError::Hashing(e.to_string()))?;
        Ok(CredentialHash(digest.to_string()))
    }

    fn verify(&self, secret: &str, digest: &CredentialHash) -> bool {
        let Ok(parsed) = PasswordHash::new(digest.as_str()) else {
            return false;
        };
        // Parameters come from the digest, not from `self.params`.
        self.argon2()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Checks the minimum password length, counting characters rather than bytes.
pub fn check_password_length(password: &str) -> std::result::Result<(), DenyReason> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DenyReason::TooShort);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2Hasher {
        Argon2Hasher::fast_insecure()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = hasher();
        for secret in ["secret1", "pässwörd", "    ", "a much longer passphrase here"] {
            let digest = hasher.hash(secret).unwrap();
            assert!(hasher.verify(secret, &digest), "{} should verify", secret);
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let hasher = hasher();
        let digest = hasher.hash("secret1").unwrap();
        assert!(!hasher.verify("secret2", &digest));
        assert!(!hasher.verify("Secret1", &digest));
        assert!(!hasher.verify("", &digest));
    }

    #[test]
    fn test_digest_is_salted_phc() {
        let hasher = hasher();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b, "each digest carries its own salt");
        assert!(a.as_str().starts_with("$argon2id$"));
        assert!(!a.as_str().contains("same"));
    }

    #[test]
    fn test_malformed_digest_is_no_match() {
        let hasher = hasher();
        for digest in [
            "",
            "not a hash",
            "$argon2id$broken",
            // legacy hex sha256 of "secret1"
            "5b11618c2e44027877d0cd0921ed166b9f176f50587fc91e7534dd2946db77d6",
        ] {
            assert!(!hasher.verify("secret1", &CredentialHash::new(digest)));
        }
    }

    #[test]
    fn test_verify_uses_params_from_digest() {
        let strong = Argon2Hasher::with_params(Params::MIN_M_COST * 2, 2, 1).unwrap();
        let digest = strong.hash("secret1").unwrap();
        assert!(hasher().verify("secret1", &digest));
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(Argon2Hasher::with_params(0, 0, 0).is_err());
    }

    #[test]
    fn test_password_length() {
        assert_eq!(check_password_length("abc"), Err(DenyReason::TooShort));
        assert_eq!(check_password_length(""), Err(DenyReason::TooShort));
        assert!(check_password_length("abcd").is_ok());
        // four characters, more than four bytes
        assert!(check_password_length("비밀번호").is_ok());
    }
}
