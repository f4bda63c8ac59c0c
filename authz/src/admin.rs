//! The process-wide admin key.

use std::fmt;
use std::sync::Arc;

use subtle::ConstantTimeEq;

/// The shared admin secret, fixed at startup.
///
/// An empty (or whitespace-only) configured key disables the admin bypass
/// entirely; it never matches anything, including an empty submission.
#[derive(Clone)]
pub struct AdminKey {
    secret: Arc<str>,
}

impl AdminKey {
    /// Creates the admin key from configuration. Surrounding whitespace is
    /// ignored.
    pub fn new(configured: impl AsRef<str>) -> Self {
        Self {
            secret: Arc::from(configured.as_ref().trim()),
        }
    }

    /// An admin key that admits nobody.
    pub fn disabled() -> Self {
        Self::new("")
    }

    /// Whether an admin key is configured at all.
    pub fn is_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Returns true iff `supplied`, trimmed, equals the configured key.
    pub fn is_admin(&self, supplied: Option<&str>) -> bool {
        let supplied = supplied.unwrap_or("").trim();
        if supplied.is_empty() || self.secret.is_empty() {
            return false;
        }

        let supplied = supplied.as_bytes();
        let expected = self.secret.as_bytes();
        supplied.len() == expected.len() && supplied.ct_eq(expected).unwrap_u8() == 1
    }
}

impl fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminKey")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_supplied_is_never_admin() {
        for configured in ["", "k3y", "  spaced  "] {
            let key = AdminKey::new(configured);
            assert!(!key.is_admin(Some("")));
            assert!(!key.is_admin(Some("   ")));
            assert!(!key.is_admin(None));
        }
    }

    #[test]
    fn test_unconfigured_key_admits_nobody() {
        let key = AdminKey::disabled();
        assert!(!key.is_enabled());
        for supplied in ["", "admin", " ", "anything"] {
            assert!(!key.is_admin(Some(supplied)));
        }

        let blank = AdminKey::new("   \t ");
        assert!(!blank.is_enabled());
        assert!(!blank.is_admin(Some("   \t ")));
    }

    #[test]
    fn test_configured_key_matches_itself() {
        let key = AdminKey::new("hunter22");
        assert!(key.is_admin(Some("hunter22")));
        assert!(key.is_admin(Some("  hunter22\n")));
    }

    #[test]
    fn test_configured_key_trimmed() {
        let key = AdminKey::new("  hunter22  ");
        assert!(key.is_admin(Some("hunter22")));
    }

    #[test]
    fn test_near_misses_rejected() {
        let key = AdminKey::new("hunter22");
        for supplied in ["hunter2", "hunter222", "Hunter22", "hunter 22"] {
            assert!(!key.is_admin(Some(supplied)), "{} should not match", supplied);
        }
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = AdminKey::new("hunter22");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("enabled: true"));
    }
}
