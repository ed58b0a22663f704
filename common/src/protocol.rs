use std::io;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Byte that ends every message on the wire.
pub const TERMINATOR: u8 = 0x00;

/// Reply sent to every client, terminator included.
pub const RESPONSE: &[u8] = b"Yo client get the fuck off!\0";

/// Inner error of the [`io::ErrorKind::InvalidData`] returned by
/// [`read_terminated`] when a message outgrows its limit.
#[derive(Debug, Error)]
#[error("message exceeds {limit} bytes")]
pub struct LimitExceeded {
    pub limit: usize,
}

/// Read bytes one at a time until [`TERMINATOR`] is seen.
///
/// Returns the accumulated bytes without the terminator. When `limit` is set,
/// a message longer than `limit` bytes is rejected with
/// [`io::ErrorKind::InvalidData`] wrapping [`LimitExceeded`].
///
/// # Errors
/// Returns an error if reading fails, the stream ends before the terminator
/// ([`io::ErrorKind::UnexpectedEof`]), or the limit is exceeded.
pub async fn read_terminated<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    limit: Option<usize>,
) -> io::Result<Vec<u8>> {
    let mut message = Vec::new();

    loop {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "stream closed after {} bytes without terminator",
                        message.len()
                    ),
                ));
            }
            Err(e) => return Err(e),
        };

        if byte == TERMINATOR {
            return Ok(message);
        }

        if let Some(limit) = limit.filter(|&max| message.len() >= max) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                LimitExceeded { limit },
            ));
        }

        message.push(byte);
    }
}

/// Write `message` followed by [`TERMINATOR`] in a single write.
///
/// # Errors
/// Returns [`io::ErrorKind::InvalidInput`] if `message` already contains the
/// terminator, or an error if writing fails.
pub async fn write_terminated<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    message: &[u8],
) -> io::Result<()> {
    if message.contains(&TERMINATOR) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "message contains a NUL byte",
        ));
    }

    let mut frame = Vec::with_capacity(message.len() + 1);
    frame.extend_from_slice(message);
    frame.push(TERMINATOR);
    writer.write_all(&frame).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok, assert_some};
    use std::io::Cursor;

    #[test]
    fn response_is_nul_terminated_text() {
        assert_eq!(RESPONSE.len(), "Yo client get the fuck off!".len() + 1);
        assert_eq!(RESPONSE.last(), Some(&TERMINATOR));
        assert_eq!(RESPONSE.iter().filter(|&&b| b == TERMINATOR).count(), 1);
    }

    #[tokio::test]
    async fn read_stops_at_terminator() {
        let mut cursor = Cursor::new(b"hi\0trailing".to_vec());
        let message = assert_ok!(read_terminated(&mut cursor, None).await);
        assert_eq!(message, b"hi");
        assert_eq!(cursor.position(), 3);
    }

    #[tokio::test]
    async fn read_empty_message() {
        let mut cursor = Cursor::new(vec![TERMINATOR]);
        let message = assert_ok!(read_terminated(&mut cursor, None).await);
        assert!(message.is_empty());
    }

    #[tokio::test]
    async fn read_binary_message() {
        let payload = (1..=255u8).collect::<Vec<_>>();
        let mut framed = payload.clone();
        framed.push(TERMINATOR);

        let mut cursor = Cursor::new(framed);
        let message = assert_ok!(read_terminated(&mut cursor, None).await);
        assert_eq!(message, payload);
    }

    #[tokio::test]
    async fn read_eof_before_terminator() {
        let mut cursor = Cursor::new(b"partial".to_vec());
        let err = assert_err!(read_terminated(&mut cursor, None).await);
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(err.to_string().contains("7 bytes"));
    }

    #[tokio::test]
    async fn read_respects_limit() {
        let mut cursor = Cursor::new(b"abcd\0".to_vec());
        assert_ok!(read_terminated(&mut cursor, Some(4)).await);

        let mut cursor = Cursor::new(b"abcde\0".to_vec());
        let err = assert_err!(read_terminated(&mut cursor, Some(4)).await);
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let inner = assert_some!(err.get_ref().and_then(|e| e.downcast_ref::<LimitExceeded>()));
        assert_eq!(inner.limit, 4);
    }

    #[tokio::test]
    async fn write_appends_terminator() {
        let mut buf = Vec::new();
        assert_ok!(write_terminated(&mut buf, b"hello").await);
        assert_eq!(buf, b"hello\0");
    }

    #[tokio::test]
    async fn write_rejects_embedded_nul() {
        let mut buf = Vec::new();
        let err = assert_err!(write_terminated(&mut buf, b"he\0llo").await);
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(buf.is_empty());
    }

    /// Deterministic NUL-free message of `len` bytes; `seed` varies the pattern.
    fn message(len: usize, seed: usize) -> Vec<u8> {
        (0..len)
            .map(|i| {
                let value = (i * 31 + seed * 17) % 255;
                u8::try_from(value + 1).unwrap_or(u8::MAX)
            })
            .collect()
    }

    #[tokio::test]
    async fn read_recovers_every_written_message() {
        let lengths = (0..64).chain([127, 128, 255, 256, 1023, 1024, 4096, 65_537]);

        for (seed, len) in lengths.enumerate() {
            let expected = message(len, seed);
            assert!(!expected.contains(&TERMINATOR));

            let mut framed = Vec::new();
            assert_ok!(write_terminated(&mut framed, &expected).await);
            assert_eq!(framed.len(), len + 1);

            let mut cursor = Cursor::new(framed);
            let read = assert_ok!(read_terminated(&mut cursor, None).await);
            assert_eq!(read, expected, "length {len}");
        }
    }

    #[tokio::test]
    async fn read_consumes_back_to_back_frames_in_order() {
        let messages = (0..20).map(|n| message(n * 7, n)).collect::<Vec<_>>();

        let mut stream = Vec::new();
        for msg in &messages {
            assert_ok!(write_terminated(&mut stream, msg).await);
        }

        let mut cursor = Cursor::new(stream);
        for msg in &messages {
            assert_eq!(&assert_ok!(read_terminated(&mut cursor, None).await), msg);
        }
        assert_err!(read_terminated(&mut cursor, None).await);
    }
}
