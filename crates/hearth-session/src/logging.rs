// SPDX-License-Identifier: Apache-2.0
//! Bridges notable session events onto the bus as [`LogMessage`], so any
//! connection that issued `SubscribeLogsRequest` can stream them out as
//! `SubscribeLogsResponse` frames.

use hearth_bus::{Bus, Topic};

/// A single log line, severity-tagged the same way as `tracing::Level`
/// (0 = trace .. 5 = error), emitted onto the bus alongside whatever
/// `tracing` call produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    /// Severity, 0 (trace) .. 5 (error).
    pub level: u8,
    /// Formatted message.
    pub message: String,
}

impl Topic for LogMessage {
    fn tag() -> String {
        "session.log_message".to_owned()
    }
}

/// Emit `message` at `level` onto `bus`'s [`LogMessage`] event signal. A
/// session with no active `SubscribeLogsRequest` simply has no subscriber
/// for it; this never blocks on there being one.
pub async fn log(bus: &Bus, level: u8, message: impl Into<String>) {
    bus.emit_event(LogMessage {
        level,
        message: message.into(),
    })
    .await;
}
