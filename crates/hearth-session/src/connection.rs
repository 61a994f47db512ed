// SPDX-License-Identifier: Apache-2.0
//! Per-connection transport halves and ephemeral session state.
//!
//! The accepted stream is split once into an independent read half and
//! write half; a background writer task owns the write half and drains an
//! `mpsc::Receiver<Frame>` fed both by the session's own replies and by any
//! background handler task's late replies. For the Noise transport both halves share a
//! [`SharedNoiseSession`] whose lock is only ever held for the brief
//! encrypt/decrypt step, never across the network await.

use hearth_proto::Frame;
use hearth_transport::{plaintext, read_packet, write_packet, SharedNoiseSession, TransportError};
use tokio::io::{AsyncRead, AsyncWrite};

/// The read half of a split connection, framing-aware. Named `FrameReader`
/// (not `ReadHalf`) to avoid colliding with `tokio::io::ReadHalf`, which
/// every caller also has in scope as the underlying split stream half.
pub enum FrameReader<R> {
    /// Plaintext varint framing.
    Plaintext(R),
    /// Noise framing, sharing cipher state with the writer half.
    Noise(R, SharedNoiseSession),
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Read and decode the next frame, blocking until one arrives.
    ///
    /// # Errors
    /// See [`TransportError`].
    pub async fn recv(&mut self) -> Result<Frame, TransportError> {
        match self {
            FrameReader::Plaintext(reader) => plaintext::read_frame(reader).await,
            FrameReader::Noise(reader, session) => {
                let packet = read_packet(reader).await?;
                session.decrypt_packet(&packet).await
            }
        }
    }
}

/// The write half of a split connection, framing-aware. Named
/// `FrameWriter` for the same reason as [`FrameReader`].
pub enum FrameWriter<W> {
    /// Plaintext varint framing.
    Plaintext(W),
    /// Noise framing, sharing cipher state with the reader half.
    Noise(W, SharedNoiseSession),
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Encode and write one frame.
    ///
    /// # Errors
    /// See [`TransportError`].
    pub async fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        match self {
            FrameWriter::Plaintext(writer) => plaintext::write_frame(writer, frame).await,
            FrameWriter::Noise(writer, session) => {
                let packet = session.encrypt_to_packet(frame).await?;
                write_packet(writer, &packet).await
            }
        }
    }
}

/// Ephemeral, per-connection state the session state machine mutates as
/// messages arrive. Dropped when the connection closes; nothing here is
/// persisted.
#[derive(Debug, Default)]
pub struct ConnectionInfo {
    /// Free-form identifier the client reported in `HelloRequest`.
    pub client_info: String,
    /// Whether `ConnectRequest` has been validated.
    pub authenticated: bool,
    /// Whether this session already issued `SubscribeStatesRequest` (a
    /// second request is a no-op).
    pub subscribed_states: bool,
    /// Whether this session already issued `SubscribeLogsRequest`.
    pub subscribed_logs: bool,
}
