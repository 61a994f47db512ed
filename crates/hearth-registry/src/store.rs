// SPDX-License-Identifier: Apache-2.0
//! A single domain's entity store: a `hash_key`-sorted vector supporting
//! binary-search lookup, safe under concurrent readers and a single
//! exclusive writer.

use std::sync::RwLock;

use crate::error::RegistryError;
use crate::record::EntityRecord;

/// The entities registered for one domain, kept sorted by `hash_key`.
#[derive(Default)]
pub struct DomainStore {
    entities: RwLock<Vec<EntityRecord>>,
}

impl DomainStore {
    /// Insert `record`, keeping the store sorted by `hash_key`.
    ///
    /// # Errors
    /// Returns [`RegistryError::DuplicateKey`] if an entity with the same
    /// `hash_key` is already present.
    pub fn register(&self, record: EntityRecord) -> Result<(), RegistryError> {
        let mut entities = self
            .entities
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match entities.binary_search_by_key(&record.hash_key(), EntityRecord::hash_key) {
            Ok(_) => Err(RegistryError::DuplicateKey(record.hash_key())),
            Err(insert_at) => {
                entities.insert(insert_at, record);
                Ok(())
            }
        }
    }

    /// Look up an entity by `hash_key`.
    #[must_use]
    pub fn by_key(&self, hash_key: u32) -> Option<EntityRecord> {
        let entities = self
            .entities
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entities
            .binary_search_by_key(&hash_key, EntityRecord::hash_key)
            .ok()
            .map(|idx| entities[idx].clone())
    }

    /// A cloned snapshot of every entity currently registered, in
    /// `hash_key` order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EntityRecord> {
        self.entities
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of entities currently registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// `true` if no entities are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use hearth_proto::{Domain, EntityInfo};

    fn record(object_id: &str) -> EntityRecord {
        EntityRecord {
            domain: Domain::Sensor,
            info: EntityInfo::new(object_id, object_id).unwrap(),
            state: None,
        }
    }

    #[test]
    fn register_keeps_sorted_order_and_rejects_duplicates() {
        let store = DomainStore::default();
        store.register(record("temp")).unwrap();
        store.register(record("motion")).unwrap();
        store.register(record("humidity")).unwrap();

        let keys: Vec<u32> = store.snapshot().iter().map(EntityRecord::hash_key).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);

        let err = store.register(record("temp")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKey(_)));
    }

    #[test]
    fn by_key_finds_registered_entities() {
        let store = DomainStore::default();
        let temp = record("temp");
        let key = temp.hash_key();
        store.register(temp).unwrap();
        assert!(store.by_key(key).is_some());
        assert!(store.by_key(key.wrapping_add(1)).is_none());
    }
}
