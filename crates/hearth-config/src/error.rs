// SPDX-License-Identifier: Apache-2.0
//! Config error taxonomy.

/// Errors raised while loading, validating, or persisting configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested key has no stored blob.
    #[error("not found")]
    NotFound,
    /// I/O error while reading or writing the backing store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The stored or supplied YAML did not parse or didn't match the
    /// expected shape.
    #[error("malformed yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// A component name referenced by the config (directly or via
    /// `auto_load()`) has no known constructor.
    #[error("unknown component: {0}")]
    UnknownComponent(String),
    /// A value parsed correctly but failed a domain invariant (e.g. a MAC
    /// address missing the locally-administered bit).
    #[error("validation failed: {0}")]
    Validation(String),
    /// Hashing or verifying a password failed.
    #[error("password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),
    /// Catch-all for store-specific failures (e.g. unresolvable platform
    /// config directory).
    #[error("{0}")]
    Other(String),
}
