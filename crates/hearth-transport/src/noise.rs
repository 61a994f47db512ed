// SPDX-License-Identifier: Apache-2.0
//! Noise_NNpsk0_25519_ChaChaPoly_SHA256 framing.
//!
//! Every on-wire packet (handshake or ready-state) is
//! `0x01 | u16_be(len) | body[len]`. The server's hello (step 2, sent once
//! right after accepting the client's empty hello) is `0x01 | server_name |
//! 0x00` — that leading `0x01` is the fixed marker for this one frame, not
//! an error. From the post-hello handshake exchange onward (steps 3-4),
//! `body` is either the raw Noise handshake message (prefixed `0x00`) or a
//! peer-reported error (prefixed `0x01` + an ASCII reason); which one a
//! `0x01` lead byte means is decided by the handshake step, not the byte
//! alone. Once both sides reach the ready state, `body` is the
//! Noise-encrypted ciphertext of an inner `u16_be(type) | u16_be(len) |
//! payload[len]` envelope.

use hearth_proto::Frame;
use snow::{Builder, TransportState};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{HandshakeError, TransportError};

/// Indicator byte for the Noise framing.
pub const INDICATOR: u8 = 0x01;
const PROLOGUE: &[u8] = b"NoiseAPIInit\x00\x00";
const NOISE_PATTERN: &str = "Noise_NNpsk0_25519_ChaChaPoly_SHA256";
const MAX_MESSAGE: usize = 65_535;
const HANDSHAKE_PREFIX: u8 = 0x00;
const ERROR_PREFIX: u8 = 0x01;
/// Lead byte of the server-hello frame (step 2). Numerically the same byte
/// as [`ERROR_PREFIX`] — the two are disambiguated by handshake step, not
/// by value: this one only ever appears as the first byte of the one frame
/// the server sends immediately after the client's empty hello.
const SERVER_HELLO_PREFIX: u8 = 0x01;

/// 32 raw PSK bytes for the Noise handshake.
pub type Psk = [u8; 32];

/// Validate a PSK byte slice, returning it as a fixed-size array.
///
/// # Errors
/// Returns [`HandshakeError::BadPskLength`] if `bytes.len() != 32`.
pub fn validate_psk(bytes: &[u8]) -> Result<Psk, HandshakeError> {
    bytes
        .try_into()
        .map_err(|_| HandshakeError::BadPskLength(bytes.len()))
}

/// Read one raw length-prefixed Noise packet (`0x01 | u16_be(len) | body`)
/// from `reader`, with no decryption applied. Exposed so the session layer
/// can run independent reader/writer tasks over split stream halves while
/// sharing only the cipher state.
///
/// # Errors
/// See [`TransportError`].
pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let indicator = reader.read_u8().await.map_err(|_| TransportError::ShortRead)?;
    if indicator != INDICATOR {
        return Err(TransportError::BadIndicator(indicator));
    }
    let len = reader
        .read_u16()
        .await
        .map_err(|_| TransportError::ShortRead)?;
    let mut body = vec![0u8; len as usize];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|_| TransportError::ShortRead)?;
    Ok(body)
}

/// Write one raw length-prefixed Noise packet. Counterpart to
/// [`read_packet`]; `body` is already-encrypted ciphertext (or, during the
/// handshake phase, a plaintext handshake/error body).
///
/// # Errors
/// Propagates the underlying I/O error.
pub async fn write_packet<W: AsyncWrite + Unpin>(
    writer: &mut W,
    body: &[u8],
) -> Result<(), TransportError> {
    let len = u16::try_from(body.len()).unwrap_or(u16::MAX);
    let mut buf = Vec::with_capacity(3 + body.len());
    buf.push(INDICATOR);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(body);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

fn surface_error_frame(body: &[u8]) -> Result<(), HandshakeError> {
    if body.first() == Some(&ERROR_PREFIX) {
        let reason = String::from_utf8_lossy(&body[1..]).into_owned();
        return Err(HandshakeError::PeerReported(reason));
    }
    Ok(())
}

/// Run the server (responder) side of the Noise handshake and return the
/// established [`TransportState`].
///
/// # Errors
/// See [`HandshakeError`] for the taxonomy of handshake failures.
pub async fn server_handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
    psk: &Psk,
    server_name: &str,
) -> Result<TransportState, TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // Step 1: client hello (empty body).
    let hello = read_packet(reader).await?;
    if !hello.is_empty() {
        return Err(HandshakeError::BadPrologue.into());
    }

    // Step 2: server hello (name + trailing NUL).
    let mut hello_body = Vec::with_capacity(1 + server_name.len() + 1);
    hello_body.push(SERVER_HELLO_PREFIX);
    hello_body.extend_from_slice(server_name.as_bytes());
    hello_body.push(0x00);
    write_packet(writer, &hello_body).await?;

    let mut handshake = Builder::new(NOISE_PATTERN.parse().map_err(HandshakeError::Snow)?)
        .prologue(PROLOGUE)
        .psk(0, psk)
        .build_responder()
        .map_err(HandshakeError::Snow)?;

    // Step 3: receive the client's (e, es, ss) message.
    let body = read_packet(reader).await?;
    surface_error_frame(&body)?;
    if body.first() != Some(&HANDSHAKE_PREFIX) {
        return Err(HandshakeError::BadPrologue.into());
    }
    let mut scratch = vec![0u8; MAX_MESSAGE];
    handshake
        .read_message(&body[1..], &mut scratch)
        .map_err(HandshakeError::Snow)?;

    // Step 4: send the handshake reply.
    let mut reply = vec![0u8; MAX_MESSAGE];
    let written = handshake
        .write_message(&[], &mut reply)
        .map_err(HandshakeError::Snow)?;
    reply.truncate(written);
    let mut framed_reply = Vec::with_capacity(1 + reply.len());
    framed_reply.push(HANDSHAKE_PREFIX);
    framed_reply.extend_from_slice(&reply);
    write_packet(writer, &framed_reply).await?;

    handshake
        .into_transport_mode()
        .map_err(|e| TransportError::Handshake(HandshakeError::Snow(e)))
}

/// Run the client (initiator) side of the Noise handshake and return the
/// established [`TransportState`] plus the server name it reported.
///
/// # Errors
/// See [`HandshakeError`] for the taxonomy of handshake failures.
pub async fn client_handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
    psk: &Psk,
) -> Result<(TransportState, String), TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // Step 1: client hello (empty body).
    write_packet(writer, &[]).await?;

    let mut handshake = Builder::new(NOISE_PATTERN.parse().map_err(HandshakeError::Snow)?)
        .prologue(PROLOGUE)
        .psk(0, psk)
        .build_initiator()
        .map_err(HandshakeError::Snow)?;

    // Step 2: server hello. This frame's lead byte is always
    // `SERVER_HELLO_PREFIX` at this step — unlike steps 3-4, a `0x01` here
    // is never an error frame, so `surface_error_frame` does not apply.
    let hello_body = read_packet(reader).await?;
    if hello_body.first() != Some(&SERVER_HELLO_PREFIX) {
        return Err(HandshakeError::BadPrologue.into());
    }
    let server_name = hello_body[1..]
        .split(|&b| b == 0x00)
        .next()
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .unwrap_or_default();

    // Step 3: send (e, es, ss).
    let mut scratch = vec![0u8; MAX_MESSAGE];
    let written = handshake
        .write_message(&[], &mut scratch)
        .map_err(HandshakeError::Snow)?;
    scratch.truncate(written);
    let mut framed = Vec::with_capacity(1 + scratch.len());
    framed.push(HANDSHAKE_PREFIX);
    framed.extend_from_slice(&scratch);
    write_packet(writer, &framed).await?;

    // Step 4: receive the handshake reply.
    let reply = read_packet(reader).await?;
    surface_error_frame(&reply)?;
    if reply.first() != Some(&HANDSHAKE_PREFIX) {
        return Err(HandshakeError::BadPrologue.into());
    }
    let mut out = vec![0u8; MAX_MESSAGE];
    handshake
        .read_message(&reply[1..], &mut out)
        .map_err(HandshakeError::Snow)?;

    let transport = handshake
        .into_transport_mode()
        .map_err(|e| TransportError::Handshake(HandshakeError::Snow(e)))?;
    Ok((transport, server_name))
}

/// A ready-state Noise session: wraps a [`TransportState`] and frames
/// application records inside the encrypted envelope
/// `u16_be(type) | u16_be(len) | payload`.
pub struct NoiseSession {
    state: TransportState,
}

impl NoiseSession {
    /// Wrap an established [`TransportState`].
    #[must_use]
    pub fn new(state: TransportState) -> Self {
        Self { state }
    }

    /// Read one application frame from `reader`, decrypting it.
    ///
    /// # Errors
    /// Returns [`TransportError::ShortRead`] on EOF/short packets, or a
    /// [`HandshakeError::MacFailure`]-wrapped error if decryption fails
    /// (terminal: the session must close).
    pub async fn read_frame<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
    ) -> Result<Frame, TransportError> {
        let packet = read_packet(reader).await?;
        self.decrypt_packet(&packet)
    }

    /// Decrypt an already-read raw packet into an application frame. Pure
    /// compute, no I/O; split out of [`NoiseSession::read_frame`] so a
    /// reader task can perform the (possibly long) network read outside any
    /// lock and only briefly hold the cipher state for this step.
    ///
    /// # Errors
    /// Returns a [`HandshakeError::MacFailure`]-wrapped error if decryption
    /// fails (terminal: the session must close), or
    /// [`TransportError::ShortRead`] if the decrypted envelope is
    /// truncated.
    pub fn decrypt_packet(&mut self, packet: &[u8]) -> Result<Frame, TransportError> {
        let mut plaintext = vec![0u8; MAX_MESSAGE];
        let n = self
            .state
            .read_message(packet, &mut plaintext)
            .map_err(|_| TransportError::Handshake(HandshakeError::MacFailure))?;
        plaintext.truncate(n);
        if plaintext.len() < 4 {
            return Err(TransportError::ShortRead);
        }
        let message_type = u16::from_be_bytes([plaintext[0], plaintext[1]]);
        let len = u16::from_be_bytes([plaintext[2], plaintext[3]]) as usize;
        let payload = plaintext
            .get(4..4 + len)
            .ok_or(TransportError::ShortRead)?
            .to_vec();
        Ok(Frame {
            message_type,
            payload,
        })
    }

    /// Write one application frame to `writer`, encrypting it.
    ///
    /// # Errors
    /// Propagates the underlying I/O error or a Noise encryption failure.
    pub async fn write_frame<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut W,
        frame: &Frame,
    ) -> Result<(), TransportError> {
        let ciphertext = self.encrypt_to_packet(frame)?;
        write_packet(writer, &ciphertext).await
    }

    /// Encrypt `frame` into a raw ciphertext packet body, with no I/O.
    /// Counterpart to [`NoiseSession::decrypt_packet`] for a writer task
    /// that holds its own write half and only needs the cipher state for
    /// this step.
    ///
    /// # Errors
    /// Returns an error if the underlying Noise cipher rejects the message
    /// (e.g. nonce exhaustion).
    pub fn encrypt_to_packet(&mut self, frame: &Frame) -> Result<Vec<u8>, TransportError> {
        let mut envelope = Vec::with_capacity(4 + frame.payload.len());
        envelope.extend_from_slice(&frame.message_type.to_be_bytes());
        let len = u16::try_from(frame.payload.len()).unwrap_or(u16::MAX);
        envelope.extend_from_slice(&len.to_be_bytes());
        envelope.extend_from_slice(&frame.payload);

        let mut ciphertext = vec![0u8; MAX_MESSAGE];
        let n = self
            .state
            .write_message(&envelope, &mut ciphertext)
            .map_err(|e| TransportError::Handshake(HandshakeError::Snow(e)))?;
        ciphertext.truncate(n);
        Ok(ciphertext)
    }
}

/// A [`NoiseSession`] shared between an independent reader task and writer
/// task. Each direction's cipher state is logically independent (separate
/// nonce counters), but `snow`'s `TransportState` exposes both through one
/// `&mut self`, so concurrent access is serialised behind a `tokio::Mutex`.
/// The lock is only ever held for the in-memory encrypt/decrypt step, never
/// across a network read/write, so a quiet peer on one direction never
/// stalls traffic on the other.
#[derive(Clone)]
pub struct SharedNoiseSession(std::sync::Arc<tokio::sync::Mutex<NoiseSession>>);

impl SharedNoiseSession {
    /// Wrap an established [`NoiseSession`] for cross-task sharing.
    #[must_use]
    pub fn new(session: NoiseSession) -> Self {
        Self(std::sync::Arc::new(tokio::sync::Mutex::new(session)))
    }

    /// Decrypt an already-read raw packet. See
    /// [`NoiseSession::decrypt_packet`].
    ///
    /// # Errors
    /// See [`NoiseSession::decrypt_packet`].
    pub async fn decrypt_packet(&self, packet: &[u8]) -> Result<Frame, TransportError> {
        self.0.lock().await.decrypt_packet(packet)
    }

    /// Encrypt a frame into a raw ciphertext packet body. See
    /// [`NoiseSession::encrypt_to_packet`].
    ///
    /// # Errors
    /// See [`NoiseSession::encrypt_to_packet`].
    pub async fn encrypt_to_packet(&self, frame: &Frame) -> Result<Vec<u8>, TransportError> {
        self.0.lock().await.encrypt_to_packet(frame)
    }
}

/// Send an explicit Noise error frame (`0x01 | reason`) and return the
/// corresponding error, for best-effort notification of the peer before
/// closing. Failure to send this is not itself fatal.
pub async fn send_error_frame<W: AsyncWrite + Unpin>(writer: &mut W, reason: &str) {
    let mut body = Vec::with_capacity(1 + reason.len());
    body.push(ERROR_PREFIX);
    body.extend_from_slice(reason.as_bytes());
    if let Err(err) = write_packet(writer, &body).await {
        tracing::debug!(?err, "failed to emit best-effort noise error frame");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn psk_from_seed(seed: u8) -> Psk {
        [seed; 32]
    }

    #[test]
    fn rejects_non_32_byte_psk() {
        assert!(validate_psk(&[0u8; 16]).is_err());
        assert!(validate_psk(&[0u8; 32]).is_ok());
    }

    #[tokio::test]
    async fn handshake_then_ready_frames_round_trip() {
        let (client_io, server_io) = duplex(4096);
        let psk = psk_from_seed(7);

        let server_task = tokio::spawn(async move {
            let (mut r, mut w) = tokio::io::split(server_io);
            let state = server_handshake(&mut r, &mut w, &psk, "node-a").await?;
            Ok::<_, TransportError>((NoiseSession::new(state), r, w))
        });

        let (mut cr, mut cw) = tokio::io::split(client_io);
        let (client_transport, server_name) =
            client_handshake(&mut cr, &mut cw, &psk).await.unwrap();
        assert_eq!(server_name, "node-a");
        let mut client_session = NoiseSession::new(client_transport);

        let (mut server_session, mut server_r, mut server_w) = server_task.await.unwrap().unwrap();

        let frame = Frame {
            message_type: 9,
            payload: b"hello".to_vec(),
        };
        client_session.write_frame(&mut cw, &frame).await.unwrap();
        let received = server_session.read_frame(&mut server_r).await.unwrap();
        assert_eq!(received, frame);

        let reply = Frame {
            message_type: 10,
            payload: b"epoch".to_vec(),
        };
        server_session
            .write_frame(&mut server_w, &reply)
            .await
            .unwrap();
        let received_reply = client_session.read_frame(&mut cr).await.unwrap();
        assert_eq!(received_reply, reply);
    }
}
