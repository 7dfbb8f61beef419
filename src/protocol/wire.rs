//! Wire format for message framing.
//!
//! Messages are length-prefixed: [4 bytes big-endian u32][payload].
//! Read/write deadlines are applied by the connection handler, not here.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{DaemonError, ProtocolErrorKind};

/// Read a length-prefixed message, returning the raw payload bytes.
///
/// An EOF on the length prefix is reported as `ConnectionClosed`; a
/// prefix larger than `max_size` is rejected without reading the body.
pub async fn read_message<R>(reader: &mut R, max_size: usize) -> Result<Vec<u8>, DaemonError>
where
    R: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => DaemonError::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed,
            },
            _ => DaemonError::Io(e),
        });
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_size {
        return Err(DaemonError::Protocol {
            kind: ProtocolErrorKind::MessageTooLarge {
                size: len,
                max: max_size,
            },
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Write a length-prefixed message and flush it.
pub async fn write_message<W>(writer: &mut W, data: &[u8]) -> Result<(), DaemonError>
where
    W: AsyncWriteExt + Unpin,
{
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}
