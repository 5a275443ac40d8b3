//! Length-prefixed bincode framing.
//!
//! ```text
//! +----------------+---------------------------+
//! | len: u32 (BE)  | bincode(Message), len B   |
//! +----------------+---------------------------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::WireError;
use crate::protocol::Message;

/// Upper bound on an encoded envelope, prefix excluded.
pub const MAX_ENVELOPE_SIZE: usize = 8192;

/// Longest value a client may write. Replies echo the value next to the
/// origin name and status text, so it sits below the envelope bound.
pub const MAX_VALUE_LEN: usize = MAX_ENVELOPE_SIZE - 256;

const PREFIX_LEN: usize = 4;

pub fn encode(message: &Message) -> Result<Bytes, WireError> {
    let body = bincode::serialize(message).map_err(WireError::Encode)?;
    if body.len() > MAX_ENVELOPE_SIZE {
        return Err(WireError::FrameTooLarge {
            size: body.len(),
            limit: MAX_ENVELOPE_SIZE,
        });
    }
    let mut frame = BytesMut::with_capacity(PREFIX_LEN + body.len());
    frame.put_u32(body.len() as u32);
    frame.extend_from_slice(&body);
    Ok(frame.freeze())
}

pub fn decode(body: &[u8]) -> Result<Message, WireError> {
    bincode::deserialize(body).map_err(WireError::Decode)
}

pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed message. A clean close before the prefix is
/// `ConnectionClosed`.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; PREFIX_LEN];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(WireError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_ENVELOPE_SIZE {
        return Err(WireError::FrameTooLarge {
            size: len,
            limit: MAX_ENVELOPE_SIZE,
        });
    }
    let mut body = BytesMut::zeroed(len);
    reader.read_exact(&mut body).await?;
    decode(&body)
}
