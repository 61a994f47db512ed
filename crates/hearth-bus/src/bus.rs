// SPDX-License-Identifier: Apache-2.0
//! The process-wide bus: two string-tag-keyed dictionaries of signals, one
//! for events and one for service requests.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use ulid::Ulid;

use crate::envelope::{Event, ServiceRequest, ServiceResponseEvent};
use crate::error::BusError;
use crate::signal::{Signal, Subscription, DEFAULT_QUEUE_DEPTH};
use crate::topic::Topic;

type AnySignal = Box<dyn Any + Send + Sync>;

/// The process-wide typed pub/sub + request dispatch fabric. Constructed
/// once before any node component's `setup()` runs and reached through the
/// ambient context thereafter.
#[derive(Default)]
pub struct Bus {
    events: RwLock<HashMap<String, AnySignal>>,
    services: RwLock<HashMap<String, AnySignal>>,
}

fn lookup<M: Send + Sync + 'static>(
    map: &RwLock<HashMap<String, AnySignal>>,
    tag: &str,
) -> Option<Arc<Signal<M>>> {
    map.read()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(tag)
        .and_then(|boxed| boxed.downcast_ref::<Arc<Signal<M>>>())
        .cloned()
}

fn get_or_create<M: Send + Sync + 'static>(
    map: &RwLock<HashMap<String, AnySignal>>,
    tag: String,
) -> Result<Arc<Signal<M>>, BusError> {
    if let Some(existing) = lookup::<M>(map, &tag) {
        return Ok(existing);
    }
    let mut write = map.write().unwrap_or_else(std::sync::PoisonError::into_inner);
    let boxed = write
        .entry(tag.clone())
        .or_insert_with(|| Box::new(Arc::new(Signal::<M>::default())) as AnySignal);
    boxed
        .downcast_ref::<Arc<Signal<M>>>()
        .cloned()
        .ok_or(BusError::TagCollision(tag))
}

impl Bus {
    /// Construct an empty bus with no signals registered yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `data` on `T`'s event signal. A missing signal (nobody has
    /// subscribed yet) is a silent no-op.5.
    pub async fn emit_event<T: Topic>(&self, data: T) -> Ulid {
        let id = Ulid::new();
        if let Some(signal) = lookup::<Event<T>>(&self.events, &T::tag()) {
            signal.dispatch(&Event { id, data }).await;
        }
        id
    }

    /// Subscribe `handler` to `T`'s event signal, creating it if absent.
    ///
    /// # Errors
    /// Returns [`BusError::TagCollision`] if `T::tag()` is already bound to
    /// an incompatible message type.
    pub fn subscribe_events<T, F, Fut>(&self, handler: F) -> Result<Subscription, BusError>
    where
        T: Topic,
        F: Fn(Event<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let signal = get_or_create::<Event<T>>(&self.events, T::tag())?;
        Ok(signal.connect(DEFAULT_QUEUE_DEPTH, handler))
    }

    /// Call the service signal for `T` with `data`. A missing signal (no
    /// handler registered) logs and returns `None` without minting an id.
    pub async fn call_service<T: Topic>(&self, data: T) -> Option<Ulid> {
        let tag = T::tag();
        let Some(signal) = lookup::<ServiceRequest<T>>(&self.services, &tag) else {
            tracing::warn!(tag, "call_service: no handler registered for this service");
            return None;
        };
        let id = Ulid::new();
        signal.dispatch(&ServiceRequest { id, data }).await;
        Some(id)
    }

    /// Register `handler` as the (possibly one-of-many) handler for `T`'s
    /// service signal, creating it if absent.
    ///
    /// # Errors
    /// Returns [`BusError::TagCollision`] if `T::tag()` is already bound to
    /// an incompatible message type.
    pub fn handle_service<T, F, Fut>(&self, handler: F) -> Result<Subscription, BusError>
    where
        T: Topic,
        F: Fn(ServiceRequest<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let signal = get_or_create::<ServiceRequest<T>>(&self.services, T::tag())?;
        Ok(signal.connect(DEFAULT_QUEUE_DEPTH, handler))
    }

    /// Like [`Bus::handle_service`], but after `handler` runs, its return
    /// value is published as a [`ServiceResponseEvent<R>`] through the
    /// event bus, correlated by the original request id.
    ///
    /// # Errors
    /// Returns [`BusError::TagCollision`] if either `T::tag()` or
    /// `ServiceResponseEvent::<R>::tag()` is already bound to an
    /// incompatible message type.
    pub fn handle_service_with_response<T, R, F, Fut>(
        self: &Arc<Self>,
        handler: F,
    ) -> Result<Subscription, BusError>
    where
        T: Topic,
        R: Topic,
        F: Fn(ServiceRequest<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        // Touch the response signal now so a TagCollision surfaces at
        // registration time rather than on the first completed call.
        get_or_create::<Event<ServiceResponseEvent<R>>>(
            &self.events,
            ServiceResponseEvent::<R>::tag(),
        )?;
        let bus = Arc::clone(self);
        self.handle_service(move |request: ServiceRequest<T>| {
            let bus = Arc::clone(&bus);
            async move {
                let request_id = request.id;
                let response = handler(request).await;
                bus.emit_event(ServiceResponseEvent {
                    request_id,
                    response,
                })
                .await;
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Ping(u32);
    impl Topic for Ping {
        fn tag() -> String {
            "ping".to_owned()
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Pressed;
    impl Topic for Pressed {
        fn tag() -> String {
            "button.press".to_owned()
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Doubled(u32);
    impl Topic for Doubled {
        fn tag() -> String {
            "doubled".to_owned()
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn emit_with_no_subscriber_is_silent_no_op() {
        let bus = Bus::new();
        let id = bus.emit_event(Ping(1)).await;
        assert!(!id.to_string().is_empty());
    }

    #[tokio::test]
    async fn subscriber_observes_events_in_emission_order() {
        let bus = Bus::new();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let _sub = bus
            .subscribe_events::<Ping, _, _>(move |event: Event<Ping>| {
                let seen_clone = Arc::clone(&seen_clone);
                async move {
                    seen_clone
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .push(event.data.0);
                }
            })
            .unwrap();

        for i in 0..5 {
            bus.emit_event(Ping(i)).await;
        }
        settle().await;
        assert_eq!(
            *seen.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
            vec![0, 1, 2, 3, 4]
        );
    }

    #[tokio::test]
    async fn call_service_without_handler_returns_none() {
        let bus = Bus::new();
        assert!(bus.call_service(Pressed).await.is_none());
    }

    #[tokio::test]
    async fn button_press_fires_handler_exactly_once_with_no_reply() {
        let bus = Bus::new();
        let hits = Arc::new(AtomicU32::new(0));
        let hits_clone = Arc::clone(&hits);
        let _sub = bus
            .handle_service::<Pressed, _, _>(move |_: ServiceRequest<Pressed>| {
                let hits_clone = Arc::clone(&hits_clone);
                async move {
                    hits_clone.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();

        let id = bus.call_service(Pressed).await;
        assert!(id.is_some());
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn service_with_response_emits_response_event_once() {
        let bus = Arc::new(Bus::new());
        let responded = Arc::new(AtomicBool::new(false));
        let responded_clone = Arc::clone(&responded);

        let _handler = bus
            .handle_service_with_response::<Ping, Doubled, _, _>(|request: ServiceRequest<Ping>| async move {
                Doubled(request.data.0 * 2)
            })
            .unwrap();
        let _listener = bus
            .subscribe_events::<ServiceResponseEvent<Doubled>, _, _>(move |event| {
                let responded_clone = Arc::clone(&responded_clone);
                async move {
                    assert_eq!(event.data.response, Doubled(42));
                    responded_clone.store(true, Ordering::SeqCst);
                }
            })
            .unwrap();

        bus.call_service(Ping(21)).await;
        settle().await;
        assert!(responded.load(Ordering::SeqCst));
    }
}
