// SPDX-License-Identifier: Apache-2.0
//! A single registered entity: its invariant metadata plus, for stateful
//! domains, the [`StateCell`] backing its current value.

use std::sync::Arc;

use hearth_proto::{Domain, EntityInfo, EntityState};

use crate::state::StateCell;

/// One entity published into a domain's store.
#[derive(Clone)]
pub struct EntityRecord {
    /// The domain this entity belongs to.
    pub domain: Domain,
    /// Invariant entity metadata (`object_id`, `hash_key`, display name, …).
    pub info: EntityInfo,
    /// The entity's state cell, or `None` for non-stateful domains
    /// (currently only [`Domain::Service`]).
    pub state: Option<Arc<StateCell<EntityState>>>,
}

impl EntityRecord {
    /// The entity's registry lookup key.
    #[must_use]
    pub fn hash_key(&self) -> u32 {
        self.info.hash_key
    }
}
