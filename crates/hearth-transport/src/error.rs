// SPDX-License-Identifier: Apache-2.0
//! Transport and handshake error taxonomy.

/// Errors raised while reading/writing frames, regardless of transport kind.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the stream mid-frame (and plain EOF is folded in here
    /// too, since both mean "no more frames are coming").
    #[error("short read: connection closed mid-frame")]
    ShortRead,
    /// The first header byte didn't match any known transport indicator
    /// (`0x00` plaintext, `0x01` Noise).
    #[error("bad indicator byte {0:#04x}")]
    BadIndicator(u8),
    /// A varuint field ran past 10 bytes without terminating.
    #[error("overlong varint")]
    OverlongVarint,
    /// The underlying I/O stream failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A Noise handshake or transport operation failed.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

/// Errors specific to establishing or maintaining a Noise session.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The peer's prologue didn't match `NoiseAPIInit\0\0`.
    #[error("bad noise prologue")]
    BadPrologue,
    /// A Noise MAC/decrypt check failed; the session cannot continue.
    #[error("noise mac failure")]
    MacFailure,
    /// The configured PSK was not exactly 32 bytes.
    #[error("psk must be exactly 32 bytes, got {0}")]
    BadPskLength(usize),
    /// The peer sent an explicit handshake-failure frame.
    #[error("peer reported handshake failure: {0}")]
    PeerReported(String),
    /// The underlying `snow` state machine rejected an operation.
    #[error("noise protocol error: {0}")]
    Snow(#[from] snow::Error),
}
