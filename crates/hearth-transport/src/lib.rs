// SPDX-License-Identifier: Apache-2.0
//! Frame transports for the Hearth node: plaintext varint framing and the
//! Noise_NNpsk0_25519_ChaChaPoly_SHA256 encrypted framing, unified behind one
//! [`FrameLink`] so the session layer never has to branch on transport kind
//! after the handshake completes.

pub mod error;
pub mod noise;
pub mod plaintext;
pub mod varint;

pub use error::{HandshakeError, TransportError};
pub use hearth_proto::Frame;
pub use noise::{read_packet, write_packet, NoiseSession, SharedNoiseSession, Psk};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

/// A connected frame-oriented link, either plaintext or an established
/// Noise session, wrapping the underlying byte stream `S`.
///
/// Once constructed (after any handshake has completed), reading and
/// writing frames is transport-agnostic: the session layer only ever calls
/// [`FrameLink::read_frame`] and [`FrameLink::write_frame`].
pub struct FrameLink<S> {
    stream: S,
    noise: Option<NoiseSession>,
}

impl<S> FrameLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a stream already past the plaintext `0x00` indicator with no
    /// encryption.
    #[must_use]
    pub fn plaintext(stream: S) -> Self {
        Self {
            stream,
            noise: None,
        }
    }

    /// Wrap a stream and an established Noise [`NoiseSession`].
    #[must_use]
    pub fn noise(stream: S, session: NoiseSession) -> Self {
        Self {
            stream,
            noise: Some(session),
        }
    }

    /// `true` if this link is encrypted.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.noise.is_some()
    }

    /// Read one frame, blocking until a full frame arrives or the stream
    /// closes.
    ///
    /// # Errors
    /// See [`TransportError`].
    pub async fn read_frame(&mut self) -> Result<Frame, TransportError> {
        match &mut self.noise {
            Some(session) => session.read_frame(&mut self.stream).await,
            None => plaintext::read_frame(&mut self.stream).await,
        }
    }

    /// Read one frame, or return `Ok(None)` if `cancel` fires first.
    ///
    /// Used by the session's reader task so a shutdown request can
    /// interrupt a blocked read between frames rather than only after one
    /// arrives.
    ///
    /// # Errors
    /// See [`TransportError`].
    pub async fn read_frame_cancellable(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<Frame>, TransportError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Ok(None),
            frame = self.read_frame() => frame.map(Some),
        }
    }

    /// Write one frame.
    ///
    /// # Errors
    /// See [`TransportError`].
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        match &mut self.noise {
            Some(session) => session.write_frame(&mut self.stream, frame).await,
            None => plaintext::write_frame(&mut self.stream, frame).await,
        }
    }

    /// Consume the link, returning the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}
