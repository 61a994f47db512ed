// SPDX-License-Identifier: Apache-2.0
//! The opaque password-check port: the core treats a configured password as
//! a validator (`check(plaintext) -> bool`), never a plaintext comparison.

use crate::error::ConfigError;

/// A validator for connect-time passwords. The core never compares
/// plaintext directly; it only ever calls `check`.
pub trait PasswordCheck: Send + Sync {
    /// Returns `true` if `plaintext` is the configured password.
    fn check(&self, plaintext: &str) -> bool;
}

/// No password configured: every attempt succeeds. Selected when
/// `ApiConfig::password` is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl PasswordCheck for OpenAccess {
    fn check(&self, _plaintext: &str) -> bool {
        true
    }
}

/// Bcrypt-backed password validator, the default when `ApiConfig::password`
/// is set.
pub struct BcryptPasswordCheck {
    hash: String,
}

impl BcryptPasswordCheck {
    /// Hash `plaintext` at the default cost and build a validator around it.
    ///
    /// # Errors
    /// Returns [`ConfigError::Password`] if hashing fails.
    pub fn hash(plaintext: &str) -> Result<Self, ConfigError> {
        let hash = bcrypt::hash(plaintext, bcrypt::DEFAULT_COST)?;
        Ok(Self { hash })
    }

    /// Build a validator from an already-computed bcrypt hash (e.g. loaded
    /// from config).
    #[must_use]
    pub fn from_hash(hash: String) -> Self {
        Self { hash }
    }
}

impl PasswordCheck for BcryptPasswordCheck {
    fn check(&self, plaintext: &str) -> bool {
        bcrypt::verify(plaintext, &self.hash).unwrap_or(false)
    }
}
