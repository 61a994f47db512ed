// SPDX-License-Identifier: Apache-2.0
//! The process-wide typed event/service bus.
//!
//! Two string-tag-keyed signal dictionaries, one for events and one for
//! service requests, each a queued fan-out broadcaster with one worker
//! task per subscriber. Handlers for a single signal observe each message
//! exactly once, in emission order; cross-signal ordering is unspecified.

mod bus;
mod envelope;
mod error;
mod signal;
mod topic;

pub use bus::Bus;
pub use envelope::{Event, ServiceRequest, ServiceResponseEvent};
pub use error::BusError;
pub use signal::{Subscription, DEFAULT_QUEUE_DEPTH};
pub use topic::Topic;
