//! Incremental host link parser: recovers `{ type id [len payload] }` frames
//! from a byte stream that may arrive fragmented and start mid-frame.
//!
//! # Known wire-format limitations
//!
//! Delimiters are not escaped. Every byte after the opening `0x7B` is scanned
//! for `0x7D`, payload bytes included, so a payload containing `0x7D` ends the
//! frame early and the remainder of the payload is read as leading garbage.
//! Payload layouts sent over this link must avoid that byte.
use crate::{
    core::{PacketId, SCRATCH_CAPACITY},
    infra::codec::frame::{FRAME_END, FRAME_START, MAX_PAYLOAD_LEN},
    protocol::transport::traits::byte_source::ByteSource,
};
use heapless::Vec;

//==================================================================================Listener

/// Receives every frame recovered by the parser.
pub trait FrameListener {
    fn on_frame(&mut self, id: PacketId, payload: &[u8]);
}

impl<F: FnMut(PacketId, &[u8])> FrameListener for F {
    fn on_frame(&mut self, id: PacketId, payload: &[u8]) {
        self(id, payload)
    }
}

/// Owned copy of a decoded frame, for callers that must release the parser
/// (or the link it reads from) before handling the frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedFrame {
    pub id: PacketId,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl OwnedFrame {
    pub fn new(id: PacketId, payload: &[u8]) -> Self {
        let mut copy = Vec::new();
        // Parser payloads never exceed the one-byte length field.
        let len = payload.len().min(MAX_PAYLOAD_LEN);
        copy.extend_from_slice(&payload[..len]).ok();
        Self { id, payload: copy }
    }
}

//==================================================================================Policy

/// What to do when the length byte announces more payload than was received
/// before the closing delimiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TruncationPolicy {
    /// Deliver the bytes that did arrive as a short payload.
    #[default]
    Deliver,
    /// Discard the frame.
    Drop,
}

/// Running counters, mostly useful for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParserStats {
    /// Frames handed to the listener.
    pub delivered: u32,
    /// Delivered frames whose payload was shorter than announced.
    pub truncated: u32,
    /// Closed frames that could not be decoded.
    pub dropped: u32,
    /// Partial frames discarded because the scratch buffer filled up.
    pub overflows: u32,
}

//==================================================================================Parser

/// Byte-at-a-time frame recovery over a scratch buffer of `N` bytes.
///
/// The scratch buffer holds the opening delimiter and everything after it
/// until the closing delimiter. A frame longer than `N` bytes can never be
/// recovered; the default capacity fits payloads up to 123 bytes.
#[derive(Debug)]
pub struct StreamParser<const N: usize = SCRATCH_CAPACITY> {
    scratch: Vec<u8, N>,
    /// Index of the first header byte (just past `0x7B`) of the open frame.
    frame_start: Option<usize>,
    policy: TruncationPolicy,
    stats: ParserStats,
}

impl<const N: usize> Default for StreamParser<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> StreamParser<N> {
    pub const fn new() -> Self {
        Self::with_policy(TruncationPolicy::Deliver)
    }

    pub const fn with_policy(policy: TruncationPolicy) -> Self {
        Self {
            scratch: Vec::new(),
            frame_start: None,
            policy,
            stats: ParserStats {
                delivered: 0,
                truncated: 0,
                dropped: 0,
                overflows: 0,
            },
        }
    }

    pub fn policy(&self) -> TruncationPolicy {
        self.policy
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    /// Whether an opening delimiter has been seen and the frame is still open.
    pub fn in_frame(&self) -> bool {
        self.frame_start.is_some()
    }

    /// Bytes currently held in the scratch buffer.
    pub fn buffered(&self) -> usize {
        self.scratch.len()
    }

    /// Forget any partial frame and go back to scanning for `0x7B`.
    pub fn reset(&mut self) {
        self.scratch.clear();
        self.frame_start = None;
    }

    /// Feed one byte. Returns `true` when a frame was handed to `listener`.
    pub fn push<L: FrameListener + ?Sized>(&mut self, byte: u8, listener: &mut L) -> bool {
        if self.scratch.push(byte).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Host link scratch buffer full ({} bytes), dropping partial frame", N);
            self.stats.overflows = self.stats.overflows.wrapping_add(1);
            self.reset();
            return false;
        }
        let position = self.scratch.len();

        let Some(start) = self.frame_start else {
            if byte == FRAME_START {
                self.frame_start = Some(position);
            } else {
                // Leading garbage is never part of a frame.
                self.scratch.clear();
            }
            return false;
        };

        if byte != FRAME_END {
            return false;
        }

        let delivered = self.close_frame(start, position - 1, listener);
        self.reset();
        delivered
    }

    /// Decode the body between `start` and the closing delimiter at `end`.
    fn close_frame<L: FrameListener + ?Sized>(
        &mut self,
        start: usize,
        end: usize,
        listener: &mut L,
    ) -> bool {
        let body = &self.scratch[start..end];
        let (id, rest) = match body {
            [kind, id, rest @ ..] => (PacketId::new(*kind, *id), rest),
            _ => {
                #[cfg(feature = "defmt")]
                defmt::debug!("Dropping frame with incomplete header ({} bytes)", body.len());
                self.stats.dropped = self.stats.dropped.wrapping_add(1);
                return false;
            }
        };

        let (payload, truncated) = match rest.split_first() {
            None => (&rest[..0], false),
            Some((&announced, data)) => {
                let announced = announced as usize;
                if data.len() >= announced {
                    (&data[..announced], false)
                } else {
                    (data, true)
                }
            }
        };

        if truncated {
            if self.policy == TruncationPolicy::Drop {
                #[cfg(feature = "defmt")]
                defmt::debug!("Dropping truncated frame {}", id);
                self.stats.dropped = self.stats.dropped.wrapping_add(1);
                return false;
            }
            self.stats.truncated = self.stats.truncated.wrapping_add(1);
        }

        listener.on_frame(id, payload);
        self.stats.delivered = self.stats.delivered.wrapping_add(1);
        true
    }

    /// Pull bytes from `source` until one frame has been delivered or the
    /// source runs dry. Returns whether a frame was delivered.
    pub fn drain<S, L>(&mut self, source: &mut S, listener: &mut L) -> Result<bool, S::Error>
    where
        S: ByteSource + ?Sized,
        L: FrameListener + ?Sized,
    {
        loop {
            match source.read_byte() {
                Ok(byte) => {
                    if self.push(byte, listener) {
                        return Ok(true);
                    }
                }
                Err(nb::Error::WouldBlock) => return Ok(false),
                Err(nb::Error::Other(err)) => return Err(err),
            }
        }
    }
}
