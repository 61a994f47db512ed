// SPDX-License-Identifier: Apache-2.0
//! A log line received over `start_logs`, fanned out on the session's own
//! local bus so callers subscribe the same way any other bus consumer does.

use hearth_bus::Topic;

/// One log line streamed from a `SubscribeLogsResponse` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Severity, 0 (trace) .. 5 (error).
    pub level: u8,
    /// Formatted log message.
    pub message: String,
}

impl Topic for LogLine {
    fn tag() -> String {
        "client.log_line".to_owned()
    }
}
