// SPDX-License-Identifier: Apache-2.0
//! Envelope types the bus wraps raw payloads in before fan-out.

use ulid::Ulid;

use crate::topic::Topic;

/// An emitted event, tagged with a fresh [`Ulid`] at emission time.
#[derive(Debug, Clone)]
pub struct Event<T> {
    /// Identifier minted when this event was emitted.
    pub id: Ulid,
    /// The event payload.
    pub data: T,
}

/// A service call, tagged with a fresh [`Ulid`] at call time so a
/// `with_response` handler can correlate its reply.
#[derive(Debug, Clone)]
pub struct ServiceRequest<T> {
    /// Identifier minted when this request was issued.
    pub id: Ulid,
    /// The request payload.
    pub data: T,
}

/// The response half of a `handle_service_with_response` round trip,
/// published back through the event bus under its own tag.
#[derive(Debug, Clone)]
pub struct ServiceResponseEvent<R> {
    /// The originating [`ServiceRequest::id`].
    pub request_id: Ulid,
    /// The handler's return value.
    pub response: R,
}

impl<R: Topic> Topic for ServiceResponseEvent<R> {
    fn tag() -> String {
        format!("{}::response", R::tag())
    }
}
