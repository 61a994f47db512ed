// SPDX-License-Identifier: Apache-2.0
//! Wire schema and message catalog for the Hearth node.
//!
//! This crate defines the domain model (entities, domains, states) and the
//! typed message catalog that the ESPHome-Native-API-compatible transport
//! and session layers build on. The on-wire framing (plaintext/Noise) lives
//! in `hearth-transport`; this crate only knows about `Frame { type, payload }`
//! and how to encode/decode the records carried inside it.

pub mod catalog;
pub mod domain;
pub mod fnv;
pub mod messages;

pub use catalog::{Catalog, CatalogError};
pub use domain::{DeviceClass, Domain, EntityCategory, EntityInfo, EntityState, ValidationError};
pub use fnv::fnv1a32;
pub use messages::{Frame, Message, Source};

/// Re-export of the ULID type used for event and service-request identifiers.
pub use ulid::Ulid;
