// SPDX-License-Identifier: Apache-2.0
//! The `Topic` trait ties a message type to the string tag the bus indexes
//! signals by.

/// A message type that can flow through the bus, either as an event or as a
/// service request/response.
///
/// Implementors provide a stable tag; two distinct types must never return
/// the same tag, or signal creation fails with
/// [`crate::error::BusError::TagCollision`].
pub trait Topic: Clone + Send + Sync + 'static {
    /// The string key this topic's signal is filed under.
    fn tag() -> String;
}
