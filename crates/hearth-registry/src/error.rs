// SPDX-License-Identifier: Apache-2.0
//! Registry error taxonomy.

/// Errors raised by registry operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// `register` was called with a `hash_key` already present in this
    /// domain's store.
    #[error("duplicate hash_key {0:#010x} in domain store")]
    DuplicateKey(u32),
    /// A domain's store was addressed before `create_domain` published it.
    #[error("domain store not yet created")]
    DomainNotRegistered,
}
