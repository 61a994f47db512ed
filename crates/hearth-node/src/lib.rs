// SPDX-License-Identifier: Apache-2.0
//! Component lifecycle, ambient context, and polling scaffold for the
//! Hearth node.

mod component;
mod constructor;
mod context;
mod error;
mod node;
mod poll;
mod priority;

pub use component::Component;
pub use constructor::ComponentFactory;
pub use context::Context;
pub use error::NodeError;
pub use node::Node;
pub use poll::{Poll, Poller};
pub use priority::InitializationPriority;
