// SPDX-License-Identifier: Apache-2.0
//! Session error taxonomy.

/// Errors raised while driving a single connection's state machine.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A message arrived that's illegal in the session's current state (a
    /// server-sourced message from the client, or an authenticated-only
    /// request before `ConnectResponse{invalid:false}`).
    #[error("unexpected message in state {state}: {message_type}")]
    UnexpectedMessage {
        /// The session state at the time of the violation.
        state: &'static str,
        /// The offending message's type code.
        message_type: u16,
    },
    /// `ListEntitiesRequest` or `SubscribeStatesRequest` arrived before
    /// authentication completed.
    #[error("access attempted before authentication")]
    UnauthenticatedAccess,
    /// The supplied `ConnectRequest` password failed validation.
    #[error("invalid connect password")]
    InvalidPassword,
    /// An orderly close requested by either side. Not a failure: the
    /// caller drains outstanding outbound frames then closes the stream.
    #[error("connection closing")]
    CloseConnection,
    /// No frame arrived within the keepalive window.
    #[error("keepalive timeout: no frame received for {0:?}")]
    KeepaliveTimeout(std::time::Duration),
    /// The frame transport failed.
    #[error(transparent)]
    Transport(#[from] hearth_transport::TransportError),
    /// Decoding or encoding a catalog record failed.
    #[error(transparent)]
    Catalog(#[from] hearth_proto::CatalogError),
    /// An entity registry operation failed while building a response.
    #[error(transparent)]
    Registry(#[from] hearth_registry::RegistryError),
    /// Subscribing to the state-change bus signal failed.
    #[error(transparent)]
    Bus(#[from] hearth_bus::BusError),
}
