// SPDX-License-Identifier: Apache-2.0
//! The state mixin: a small cell that diffs on write and emits a
//! `StateChange` event on the ambient bus only on strict inequality.

use std::sync::{Arc, RwLock};

use hearth_bus::{Bus, Topic};

/// Published on the bus whenever a [`StateCell`] actually changes value.
#[derive(Debug, Clone)]
pub struct StateChange<T> {
    /// The owning entity's `hash_key`.
    pub key: u32,
    /// The newly stored value.
    pub new: T,
}

impl<T: Clone + Send + Sync + 'static> Topic for StateChange<T> {
    fn tag() -> String {
        format!("state_change::{}", std::any::type_name::<T>())
    }
}

/// A value cell owned by one entity. `set` is a no-op when the new value
/// structurally equals the current one; otherwise it stores the value and
/// emits exactly one [`StateChange`] on the ambient bus.
pub struct StateCell<T> {
    key: u32,
    bus: Arc<Bus>,
    current: RwLock<T>,
}

impl<T> StateCell<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Construct a cell for the entity identified by `key`, seeded with
    /// `initial`. No `StateChange` is emitted for the seed value.
    pub fn new(key: u32, bus: Arc<Bus>, initial: T) -> Self {
        Self {
            key,
            bus,
            current: RwLock::new(initial),
        }
    }

    /// The owning entity's `hash_key`.
    #[must_use]
    pub fn key(&self) -> u32 {
        self.key
    }

    /// The current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Store `value` if it differs from the current one, emitting exactly
    /// one [`StateChange`] in that case.
    pub async fn set(&self, value: T) {
        let changed = {
            let mut guard = self
                .current
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if *guard == value {
                false
            } else {
                *guard = value.clone();
                true
            }
        };
        if changed {
            self.bus
                .emit_event(StateChange {
                    key: self.key,
                    new: value,
                })
                .await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn identical_set_emits_exactly_one_change() {
        let bus = Arc::new(Bus::new());
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = Arc::clone(&count);
        let _sub = bus
            .subscribe_events::<StateChange<bool>, _, _>(move |_| {
                let count_clone = Arc::clone(&count_clone);
                async move {
                    count_clone.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();

        let cell = StateCell::new(42, Arc::clone(&bus), false);
        cell.set(true).await;
        cell.set(true).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_reflects_last_set_value() {
        let bus = Arc::new(Bus::new());
        let cell = StateCell::new(1, bus, 0_i32);
        assert_eq!(cell.get(), 0);
        cell.set(5).await;
        assert_eq!(cell.get(), 5);
    }
}
