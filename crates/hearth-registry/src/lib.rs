// SPDX-License-Identifier: Apache-2.0
//! The entity registry and state mixin.
//!
//! A fixed-shape, one-slot-per-domain container of `hash_key`-sorted entity
//! stores, plus [`StateCell`], the diff-on-write value cell every stateful
//! entity uses to publish [`StateChange`] events on the ambient bus.

mod error;
mod record;
mod registry;
mod state;
mod store;

pub use error::RegistryError;
pub use record::EntityRecord;
pub use registry::Registry;
pub use state::{StateCell, StateChange};
pub use store::DomainStore;
