// SPDX-License-Identifier: Apache-2.0
//! Storage port for raw config blobs, and a thin service that (de)serializes
//! YAML values through it.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::ConfigError;

/// Storage port for raw config blobs, keyed by logical name (e.g. a node's
/// config file stem). Implementations need not know about YAML or the
/// config schema at all.
pub trait ConfigStore {
    /// Load a raw config blob. Returns [`ConfigError::NotFound`] when
    /// missing.
    ///
    /// # Errors
    /// See [`ConfigError`].
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;

    /// Persist a raw config blob.
    ///
    /// # Errors
    /// See [`ConfigError`].
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Serializes config values as YAML and delegates storage to a
/// [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize a config value for `key`. Returns `Ok(None)` if
    /// missing.
    ///
    /// # Errors
    /// Returns [`ConfigError::Yaml`] on malformed YAML, or propagates the
    /// underlying store error.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) => {
                if bytes.is_empty() {
                    return Ok(None);
                }
                Ok(Some(serde_yaml::from_slice(&bytes)?))
            }
            Err(ConfigError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Serialize and persist a config value for `key`.
    ///
    /// # Errors
    /// See [`ConfigError`].
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_yaml::to_string(value)?;
        self.store.save_raw(key, data.as_bytes())
    }
}
