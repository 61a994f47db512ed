// SPDX-License-Identifier: Apache-2.0
//! The fixed-shape, one-slot-per-domain entity registry.

use std::sync::OnceLock;

use hearth_proto::Domain;

use crate::error::RegistryError;
use crate::record::EntityRecord;
use crate::store::DomainStore;

const DOMAIN_COUNT: usize = Domain::ALL.len();

fn domain_index(domain: Domain) -> Option<usize> {
    Domain::ALL.iter().position(|d| *d == domain)
}

/// A fixed-shape container with one slot per domain. A slot is published
/// once, via [`Registry::create_domain`], and never rewritten thereafter.
pub struct Registry {
    slots: [OnceLock<DomainStore>; DOMAIN_COUNT],
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| OnceLock::new()),
        }
    }
}

impl Registry {
    /// Construct an empty registry (no domain slots published yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the store for `domain` if it hasn't been already. Idempotent:
    /// calling this twice for the same domain is not an error.
    ///
    /// # Errors
    /// Returns [`RegistryError::DomainNotRegistered`] if `domain` is not one
    /// of the 24 known domains (only possible for future, non-exhaustive
    /// variants this build doesn't know about).
    pub fn create_domain(&self, domain: Domain) -> Result<(), RegistryError> {
        let index = domain_index(domain).ok_or(RegistryError::DomainNotRegistered)?;
        let _ = self.slots[index].get_or_init(DomainStore::default);
        Ok(())
    }

    fn store(&self, domain: Domain) -> Result<&DomainStore, RegistryError> {
        let index = domain_index(domain).ok_or(RegistryError::DomainNotRegistered)?;
        self.slots[index]
            .get()
            .ok_or(RegistryError::DomainNotRegistered)
    }

    /// Register `record` into `domain`'s store.
    ///
    /// # Errors
    /// Returns [`RegistryError::DomainNotRegistered`] if `create_domain`
    /// hasn't been called for this domain yet, or
    /// [`RegistryError::DuplicateKey`] if its `hash_key` collides with an
    /// already-registered entity.
    pub fn register(&self, domain: Domain, record: EntityRecord) -> Result<(), RegistryError> {
        self.store(domain)?.register(record)
    }

    /// Look up an entity by `hash_key` within `domain`.
    ///
    /// # Errors
    /// Returns [`RegistryError::DomainNotRegistered`] if the domain slot
    /// hasn't been published yet.
    pub fn by_key(&self, domain: Domain, hash_key: u32) -> Result<Option<EntityRecord>, RegistryError> {
        Ok(self.store(domain)?.by_key(hash_key))
    }

    /// A cloned snapshot of every entity in `domain`.
    ///
    /// # Errors
    /// Returns [`RegistryError::DomainNotRegistered`] if the domain slot
    /// hasn't been published yet.
    pub fn snapshot(&self, domain: Domain) -> Result<Vec<EntityRecord>, RegistryError> {
        Ok(self.store(domain)?.snapshot())
    }

    /// Iterate over every published domain's entities, in fixed domain
    /// declaration order, yielding `(domain, entity)` pairs.
    pub fn iter_all(&self) -> impl Iterator<Item = (Domain, EntityRecord)> + '_ {
        Domain::ALL.iter().flat_map(move |&domain| {
            let index = domain_index(domain).unwrap_or(usize::MAX);
            let entities = self
                .slots
                .get(index)
                .and_then(OnceLock::get)
                .map(DomainStore::snapshot)
                .unwrap_or_default();
            entities.into_iter().map(move |record| (domain, record))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use hearth_proto::EntityInfo;

    fn record(domain: Domain, object_id: &str) -> EntityRecord {
        EntityRecord {
            domain,
            info: EntityInfo::new(object_id, object_id).unwrap(),
            state: None,
        }
    }

    #[test]
    fn by_key_round_trips_registered_entity() {
        let registry = Registry::new();
        registry.create_domain(Domain::Sensor).unwrap();
        let entity = record(Domain::Sensor, "temp");
        let key = entity.hash_key();
        registry.register(Domain::Sensor, entity.clone()).unwrap();

        let found = registry.by_key(Domain::Sensor, key).unwrap().unwrap();
        assert_eq!(found.info.object_id, entity.info.object_id);
    }

    #[test]
    fn unregistered_domain_is_an_error() {
        let registry = Registry::new();
        let err = registry.by_key(Domain::Switch, 1).unwrap_err();
        assert!(matches!(err, RegistryError::DomainNotRegistered));
    }

    #[test]
    fn iter_all_yields_fixed_domain_order() {
        let registry = Registry::new();
        registry.create_domain(Domain::Sensor).unwrap();
        registry.create_domain(Domain::Switch).unwrap();
        registry
            .register(Domain::Switch, record(Domain::Switch, "relay"))
            .unwrap();
        registry
            .register(Domain::Sensor, record(Domain::Sensor, "temp"))
            .unwrap();

        let order: Vec<Domain> = registry.iter_all().map(|(domain, _)| domain).collect();
        // BinarySensor precedes Sensor precedes Switch in declaration order;
        // only Sensor and Switch were published, and both appear in that order.
        assert_eq!(order, vec![Domain::Sensor, Domain::Switch]);
    }

    #[test]
    fn create_domain_is_idempotent() {
        let registry = Registry::new();
        registry.create_domain(Domain::Sensor).unwrap();
        registry.create_domain(Domain::Sensor).unwrap();
        registry
            .register(Domain::Sensor, record(Domain::Sensor, "temp"))
            .unwrap();
        assert_eq!(registry.snapshot(Domain::Sensor).unwrap().len(), 1);
    }
}
