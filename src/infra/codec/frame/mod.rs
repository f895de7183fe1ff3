//! Host link frame encoder.
//!
//! Wire format, byte exact:
//!
//! ```text
//! 0x7B <type:u8> <id:u8> [<len:u8> <payload:len bytes>] 0x7D
//! ```
//!
//! The length byte and payload are present only when the payload is not
//! empty, so an empty frame is exactly four bytes. Decoding needs stream
//! context and lives in [`StreamParser`](crate::protocol::link::parser::StreamParser).
use crate::{core::PacketId, error::FrameError};

//==================================================================================Constants

/// Opening delimiter (`{`).
pub const FRAME_START: u8 = 0x7B;
/// Closing delimiter (`}`).
pub const FRAME_END: u8 = 0x7D;
/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;
/// Delimiters plus type and id.
pub const FRAME_OVERHEAD: usize = 4;
/// Largest encoded frame.
pub const MAX_FRAME_LEN: usize = FRAME_OVERHEAD + 1 + MAX_PAYLOAD_LEN;

//==================================================================================Encoding

/// Size of the encoded frame for a payload of `payload_len` bytes.
pub const fn encoded_len(payload_len: usize) -> usize {
    if payload_len == 0 {
        FRAME_OVERHEAD
    } else {
        FRAME_OVERHEAD + 1 + payload_len
    }
}

/// Encode a frame into `out` and return the number of bytes written.
pub fn encode_into(id: PacketId, payload: &[u8], out: &mut [u8]) -> Result<usize, FrameError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLong { len: payload.len() });
    }
    let needed = encoded_len(payload.len());
    if out.len() < needed {
        return Err(FrameError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }

    out[0] = FRAME_START;
    out[1] = id.kind;
    out[2] = id.id;
    let mut cursor = 3;
    if !payload.is_empty() {
        out[cursor] = payload.len() as u8;
        cursor += 1;
        out[cursor..cursor + payload.len()].copy_from_slice(payload);
        cursor += payload.len();
    }
    out[cursor] = FRAME_END;
    Ok(cursor + 1)
}

/// Stack-allocated encoded frame, handy when the caller has no buffer at hand.
#[derive(Clone)]
pub struct EncodedFrame {
    buffer: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl EncodedFrame {
    pub fn encode(id: PacketId, payload: &[u8]) -> Result<Self, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_LEN];
        let len = encode_into(id, payload, &mut buffer)?;
        Ok(Self { buffer, len })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
