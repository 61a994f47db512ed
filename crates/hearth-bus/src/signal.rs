// SPDX-License-Identifier: Apache-2.0
//! Internal fan-out primitive: a queued broadcaster with one worker task per
//! subscriber.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tokio::sync::mpsc;

/// Queue depth for each subscriber's mailbox. A full mailbox blocks the
/// emitting producer (explicit backpressure).
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

struct Slot<M> {
    id: u64,
    sender: mpsc::Sender<M>,
}

/// A single topic's fan-out broadcaster. Lives behind an `Arc` inside the
/// [`crate::Bus`]'s type-erased maps; one instance per distinct topic tag.
pub struct Signal<M> {
    slots: RwLock<Vec<Slot<M>>>,
    next_id: AtomicU64,
}

impl<M> Default for Signal<M> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<M> Signal<M>
where
    M: Clone + Send + 'static,
{
    /// Connect `handler` as a new slot with a mailbox of `capacity`,
    /// spawning its dedicated worker task. Returns a guard that disconnects
    /// the slot when dropped.
    pub fn connect<F, Fut>(
        self: &std::sync::Arc<Self>,
        capacity: usize,
        handler: F,
    ) -> Subscription
    where
        F: Fn(M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = mpsc::channel(capacity);
        self.push_slot(Slot { id, sender: tx });

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                handler(message).await;
            }
        });

        let signal = std::sync::Arc::clone(self);
        Subscription {
            cleanup: Some(Box::new(move || signal.remove_slot(id))),
        }
    }

    /// Fan a message out to every connected slot, awaiting each send in
    /// order so that "emission order" holds per-slot. Queues
    /// not dropped out from under us mid-iteration since each sender is
    /// independently owned by its worker task.
    pub async fn dispatch(&self, message: &M) {
        let senders: Vec<mpsc::Sender<M>> = self
            .slots
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|slot| slot.sender.clone())
            .collect();
        for sender in senders {
            if sender.send(message.clone()).await.is_err() {
                tracing::debug!("bus subscriber dropped its mailbox before dispatch completed");
            }
        }
    }

    /// `true` if at least one slot is connected.
    pub fn has_subscribers(&self) -> bool {
        !self
            .slots
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_empty()
    }

    fn push_slot(&self, slot: Slot<M>) {
        self.slots
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(slot);
    }

    fn remove_slot(&self, id: u64) {
        self.slots
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|slot| slot.id != id);
    }
}

/// A live connection to a signal. Dropping it disconnects the slot and lets
/// its worker task exit once its mailbox drains.
#[must_use = "dropping a Subscription immediately disconnects it"]
pub struct Subscription {
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test]
    async fn dispatch_reaches_all_connected_slots() {
        let signal: Arc<Signal<u32>> = Arc::default();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_a = Arc::clone(&seen);
        let _sub_a = signal.connect(4, move |_: u32| {
            let seen_a = Arc::clone(&seen_a);
            async move {
                seen_a.fetch_add(1, Ordering::SeqCst);
            }
        });
        let seen_b = Arc::clone(&seen);
        let _sub_b = signal.connect(4, move |_: u32| {
            let seen_b = Arc::clone(&seen_b);
            async move {
                seen_b.fetch_add(1, Ordering::SeqCst);
            }
        });

        signal.dispatch(&7).await;
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropping_subscription_disconnects_the_slot() {
        let signal: Arc<Signal<u32>> = Arc::default();
        let sub = signal.connect(4, |_: u32| async {});
        assert!(signal.has_subscribers());
        drop(sub);
        assert!(!signal.has_subscribers());
    }
}
