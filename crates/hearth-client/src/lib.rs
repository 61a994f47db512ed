// SPDX-License-Identifier: Apache-2.0
//! Client-side session for driving a peer Hearth (or ESPHome-Native-API-compatible)
//! node: connect, list entities into a local mirror registry, subscribe to
//! state changes, and stream logs.

mod error;
mod logs;
mod session;

pub use error::ClientError;
pub use logs::LogLine;
pub use session::{ClientSession, API_VERSION_MAJOR, API_VERSION_MINOR};
