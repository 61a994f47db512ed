// SPDX-License-Identifier: Apache-2.0
//! Client-side session error taxonomy.

/// Errors raised while connecting or driving a client session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// `list_entities` was called while a previous call is still in flight.
    #[error("list_entities already in progress")]
    AlreadyInProgress,
    /// `list_entities` didn't receive `ListEntitiesDoneResponse` in time.
    #[error("list_entities timed out")]
    Timeout,
    /// The session's driver task has already exited.
    #[error("connection closed")]
    ConnectionClosed,
    /// The server rejected the `ConnectRequest` password.
    #[error("server rejected the connect password")]
    InvalidPassword,
    /// A handshake-phase message arrived out of order.
    #[error("unexpected message during handshake: expected {0}")]
    UnexpectedHandshakeMessage(&'static str),
    /// The frame transport failed.
    #[error(transparent)]
    Transport(#[from] hearth_transport::TransportError),
    /// Encoding or decoding a catalog record failed.
    #[error(transparent)]
    Catalog(#[from] hearth_proto::CatalogError),
    /// Subscribing to the client-local bus failed.
    #[error(transparent)]
    Bus(#[from] hearth_bus::BusError),
}
