//! Length-prefixed framing over a reliable stream
//!
//! Format: [4 bytes little-endian length][bincode payload]

use std::io;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::game::constants::net::MAX_MESSAGE_SIZE;
use crate::net::protocol::{decode, encode, DecodeError, EncodeError};

/// Errors that can occur during message framing
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Message too large: {0} bytes (max {1})")]
    MessageTooLarge(usize, usize),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The frame was read in full but its payload did not decode.
    /// The stream is still aligned on the next frame.
    #[error("Malformed frame ({len} bytes): {source}")]
    Malformed { len: usize, source: DecodeError },
}

fn eof_as_closed(e: io::Error) -> FramingError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        FramingError::ConnectionClosed
    } else {
        FramingError::Io(e)
    }
}

/// Read one raw frame
pub async fn read_frame<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Vec<u8>, FramingError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.map_err(eof_as_closed)?;

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(len, MAX_MESSAGE_SIZE));
    }
    if len == 0 {
        return Ok(Vec::new());
    }

    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await.map_err(eof_as_closed)?;
    Ok(buf)
}

/// Write one raw frame and flush
pub async fn write_frame<W: AsyncWrite + Unpin>(
    stream: &mut W,
    data: &[u8],
) -> Result<(), FramingError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(data.len(), MAX_MESSAGE_SIZE));
    }

    let len_bytes = (data.len() as u32).to_le_bytes();
    stream.write_all(&len_bytes).await?;
    stream.write_all(data).await?;
    stream.flush().await?;

    Ok(())
}

/// Read and decode one message, returning it with its payload length.
/// A frame that fails to decode is consumed and reported as
/// [`FramingError::Malformed`], so the caller may keep reading.
pub async fn read_message<R, T>(stream: &mut R) -> Result<(T, usize), FramingError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let frame = read_frame(stream).await?;
    let len = frame.len();
    match decode(&frame) {
        Ok(message) => Ok((message, len)),
        Err(source) => Err(FramingError::Malformed { len, source }),
    }
}

/// Encode and write one message. Returns the bytes put on the wire,
/// length prefix included.
pub async fn write_message<W, T>(stream: &mut W, message: &T) -> Result<usize, FramingError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = encode(message)?;
    write_frame(stream, &bytes).await?;
    Ok(bytes.len() + 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{ClientMessage, PeerMessage, Role};
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_frame() {
        let mut mock = Builder::new()
            .read(&3u32.to_le_bytes())
            .read(&[1, 2, 3])
            .build();
        let frame = read_frame(&mut mock).await.unwrap();
        assert_eq!(frame, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_write_frame() {
        let mut mock = Builder::new()
            .write(&2u32.to_le_bytes())
            .write(&[9, 8])
            .build();
        write_frame(&mut mock, &[9, 8]).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_frame() {
        let mut mock = Builder::new().read(&0u32.to_le_bytes()).build();
        assert!(read_frame(&mut mock).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_length_rejected() {
        let len = (MAX_MESSAGE_SIZE as u32 + 1).to_le_bytes();
        let mut mock = Builder::new().read(&len).build();
        let err = read_frame(&mut mock).await.unwrap_err();
        assert!(matches!(err, FramingError::MessageTooLarge(_, _)));

        let big = vec![0u8; MAX_MESSAGE_SIZE + 1];
        let mut sink = Builder::new().build();
        let err = write_frame(&mut sink, &big).await.unwrap_err();
        assert!(matches!(err, FramingError::MessageTooLarge(_, _)));
    }

    #[tokio::test]
    async fn test_eof_is_connection_closed() {
        let mut mock = Builder::new().read(&[5, 0]).build();
        let err = read_frame(&mut mock).await.unwrap_err();
        assert!(matches!(err, FramingError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_message_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let sent = ClientMessage::Peer(PeerMessage::MouseEaten {
            eater_role: Role::Guest,
        });
        write_message(&mut client, &sent).await.unwrap();
        write_message(&mut client, &ClientMessage::CreateRoom).await.unwrap();

        let (first, first_len) = read_message::<_, ClientMessage>(&mut server).await.unwrap();
        let (second, _) = read_message::<_, ClientMessage>(&mut server).await.unwrap();
        assert_eq!(first, sent);
        assert_eq!(first_len, encode(&sent).unwrap().len());
        assert_eq!(second, ClientMessage::CreateRoom);
    }

    #[tokio::test]
    async fn test_write_message_reports_wire_size() {
        let payload = encode(&ClientMessage::CreateRoom).unwrap();
        let mut sink = Builder::new()
            .write(&(payload.len() as u32).to_le_bytes())
            .write(&payload)
            .build();
        let written = write_message(&mut sink, &ClientMessage::CreateRoom)
            .await
            .unwrap();
        assert_eq!(written, payload.len() + 4);
    }

    #[tokio::test]
    async fn test_garbage_frame_is_skipped() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, &[0xFF; 8]).await.unwrap();
        write_message(&mut client, &ClientMessage::CreateRoom).await.unwrap();

        let err = read_message::<_, ClientMessage>(&mut server).await.unwrap_err();
        assert!(matches!(err, FramingError::Malformed { len: 8, .. }));
        let (next, _) = read_message::<_, ClientMessage>(&mut server).await.unwrap();
        assert_eq!(next, ClientMessage::CreateRoom);
    }
}
