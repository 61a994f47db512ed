// SPDX-License-Identifier: Apache-2.0
//! The server-side connection state machine for the Hearth node: drives one
//! accepted stream from transport handshake through
//! `Hello`/`Connect`/`Ready` to an orderly or error close.

mod connection;
mod error;
mod identity;
mod logging;
mod server;
mod services;
mod state;
mod watchdog;

pub use connection::{ConnectionInfo, FrameReader, FrameWriter};
pub use error::SessionError;
pub use identity::{device_info_response, hello_response, API_VERSION_MAJOR, API_VERSION_MINOR, SERVER_INFO};
pub use logging::LogMessage;
pub use server::run_session;
pub use services::{
    dispatch_command, ButtonPress, ClimateControl, LightCommand, NumberSetValue, SelectSetOption,
    SwitchCommand, UnimplementedCommand,
};
pub use state::SessionState;
pub use watchdog::{with_keepalive, KEEPALIVE_TIMEOUT};
