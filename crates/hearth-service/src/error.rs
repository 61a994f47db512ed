// SPDX-License-Identifier: Apache-2.0
//! API server component error taxonomy.

/// Errors raised while assembling or binding the API server component.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// `api.encryption.key` did not base64-decode.
    #[error("invalid encryption key encoding: {0}")]
    BadKeyEncoding(#[from] base64::DecodeError),
    /// `api.encryption.key` decoded to something other than 32 bytes.
    #[error("encryption key must be 32 bytes, got {0}")]
    BadKeyLength(usize),
    /// Hashing the configured connect password failed.
    #[error(transparent)]
    Password(#[from] hearth_config::ConfigError),
    /// Binding the configured listen address failed.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// The address that failed to bind.
        address: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
