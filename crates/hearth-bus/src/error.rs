// SPDX-License-Identifier: Apache-2.0
//! Bus error taxonomy.

/// Errors raised while creating or dispatching through a bus signal.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Two distinct topic types produced the same string tag. This is a
    /// programming error in the topic definitions, not a runtime
    /// condition callers can recover from by retrying.
    #[error("topic tag {0:?} is already bound to a different message type")]
    TagCollision(String),
}
