// SPDX-License-Identifier: Apache-2.0
//! Plaintext varint framing: `0x00 | varuint(len) | varuint(type) | payload[len]`.

use hearth_proto::Frame;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransportError;
use crate::varint::{decode_varuint, encode_varuint};

/// Indicator byte for the plaintext framing.
pub const INDICATOR: u8 = 0x00;

/// Largest payload this transport will allocate a buffer for. The wire
/// varuint can claim far more than this; a length above it is treated the
/// same as any other malformed length field rather than attempted.
const MAX_FRAME_PAYLOAD: u64 = 1 << 20;

/// Read one plaintext frame from `reader`.
///
/// # Errors
/// Returns [`TransportError::ShortRead`] on EOF (including a clean close
/// between frames), [`TransportError::BadIndicator`] if the header byte
/// isn't `0x00`, or [`TransportError::OverlongVarint`] on a malformed
/// length/type field or a claimed length over [`MAX_FRAME_PAYLOAD`].
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, TransportError> {
    let indicator = reader.read_u8().await.map_err(|_| TransportError::ShortRead)?;
    if indicator != INDICATOR {
        return Err(TransportError::BadIndicator(indicator));
    }
    let len = read_varuint(reader).await?;
    if len > MAX_FRAME_PAYLOAD {
        return Err(TransportError::OverlongVarint);
    }
    let message_type = read_varuint(reader).await?;
    let mut payload = vec![0u8; len as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|_| TransportError::ShortRead)?;
    Ok(Frame {
        message_type: u16::try_from(message_type).unwrap_or(u16::MAX),
        payload,
    })
}

async fn read_varuint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u64, TransportError> {
    let mut buf = Vec::new();
    loop {
        let byte = reader.read_u8().await.map_err(|_| TransportError::ShortRead)?;
        buf.push(byte);
        if let Some((value, used)) = decode_varuint(&buf)? {
            debug_assert_eq!(used, buf.len());
            return Ok(value);
        }
    }
}

/// Write one plaintext frame to `writer` in a single call, so the indicator,
/// length, type, and payload are emitted atomically from the caller's
/// perspective (the caller is expected to hold any cross-task send lock for
/// the duration of this call).
///
/// # Errors
/// Propagates the underlying I/O error.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), TransportError> {
    let mut buf = Vec::with_capacity(3 + frame.payload.len());
    buf.push(INDICATOR);
    encode_varuint(frame.payload.len() as u64, &mut buf);
    encode_varuint(u64::from(frame.message_type), &mut buf);
    buf.extend_from_slice(&frame.payload);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_preserves_frame() {
        let frame = Frame {
            message_type: 7,
            payload: vec![1, 2, 3, 4],
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_frame(&mut cursor).await.unwrap();
        assert_eq!(decoded, frame);
    }

    #[tokio::test]
    async fn bad_indicator_is_rejected() {
        let mut cursor = std::io::Cursor::new(vec![0x01, 0x00, 0x00]);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, TransportError::BadIndicator(0x01)));
    }

    #[tokio::test]
    async fn empty_stream_is_short_read() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, TransportError::ShortRead));
    }

    #[tokio::test]
    async fn claimed_length_over_the_cap_is_rejected_before_allocating() {
        let mut buf = Vec::new();
        buf.push(INDICATOR);
        encode_varuint(MAX_FRAME_PAYLOAD + 1, &mut buf);
        encode_varuint(1, &mut buf);
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, TransportError::OverlongVarint));
    }

    #[tokio::test]
    async fn empty_payload_round_trips() {
        let frame = Frame {
            message_type: 1,
            payload: Vec::new(),
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_frame(&mut cursor).await.unwrap();
        assert_eq!(decoded, frame);
    }
}
