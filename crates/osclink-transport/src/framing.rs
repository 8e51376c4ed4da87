//! Length-prefix framing for stream transports
//!
//! Wire format:
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ Bytes 0-3: Payload length (uint32, byte order  │
//! │            fixed per connection)               │
//! ├────────────────────────────────────────────────┤
//! │ Payload (OSC-encoded packet)                   │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! UDP carries no prefix; datagram boundaries are packet boundaries.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Size of the length prefix
pub const PREFIX_SIZE: usize = 4;

/// Byte order of the length prefix, fixed per connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Network order (the common convention)
    #[default]
    Big,
    Little,
}

/// Wrap a payload with its 4-byte length prefix.
///
/// The payload length must fit in `u32`; that is the caller's contract.
pub fn frame(payload: &[u8], order: ByteOrder) -> Bytes {
    let mut buf = BytesMut::with_capacity(PREFIX_SIZE + payload.len());
    match order {
        ByteOrder::Big => buf.put_u32(payload.len() as u32),
        ByteOrder::Little => buf.put_u32_le(payload.len() as u32),
    }
    buf.extend_from_slice(payload);
    buf.freeze()
}

/// Consume at most one complete frame from the accumulation buffer.
///
/// Returns `Ok(None)` while the prefix or body is still partial, leaving
/// the buffer untouched. Call in a loop: a single read may carry several
/// frames, and a frame may span several reads.
///
/// A prefix announcing more than `max_frame_size` bytes is unrecoverable
/// for the stream (there is no way to resynchronize) and returns
/// [`TransportError::FrameTooLarge`].
pub fn extract(buf: &mut BytesMut, order: ByteOrder, max_frame_size: usize) -> Result<Option<Bytes>> {
    if buf.len() < PREFIX_SIZE {
        return Ok(None);
    }

    let len = match order {
        ByteOrder::Big => (&buf[..PREFIX_SIZE]).get_u32() as usize,
        ByteOrder::Little => (&buf[..PREFIX_SIZE]).get_u32_le() as usize,
    };

    if len > max_frame_size {
        return Err(TransportError::FrameTooLarge {
            len,
            max: max_frame_size,
        });
    }

    if buf.len() < PREFIX_SIZE + len {
        return Ok(None);
    }

    buf.advance(PREFIX_SIZE);
    Ok(Some(buf.split_to(len).freeze()))
}
