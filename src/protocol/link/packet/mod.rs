//! Typed packets: a fixed-layout payload bound to a stable `(type, id)`
//! identity, with an optional minimum interval between sends.
use crate::{
    core::PacketId,
    error::SendError,
    infra::codec::traits::PacketPayload,
    protocol::transport::traits::{byte_sink::ByteSink, frame_sender::FrameSender},
};
use embassy_time::{Duration, Instant};

/// Packet without payload, typically used for error and acknowledge events.
pub type SignalPacket = TypedPacket<[u8; 0]>;

/// A payload of type `T` that always goes out under the same identity.
///
/// Fields are updated in place through [`payload_mut`](Self::payload_mut) (usually with
/// [`BitField`](crate::infra::codec::bits::BitField) descriptors) or replaced at once with
/// [`set_payload`](Self::set_payload). Each send encodes a snapshot of the
/// payload bytes, so a send never observes a half-applied update.
#[derive(Debug, Clone)]
pub struct TypedPacket<T: PacketPayload> {
    id: PacketId,
    payload: T,
    /// Time of the last timestamped send that reached the sink.
    last_sent: Option<Instant>,
}

impl<T: PacketPayload + Default> TypedPacket<T> {
    /// Packet with a default (usually zeroed) payload.
    pub fn with_default(id: PacketId) -> Self {
        Self::new(id, T::default())
    }
}

impl<T: PacketPayload> TypedPacket<T> {
    pub const fn new(id: PacketId, payload: T) -> Self {
        Self {
            id,
            payload,
            last_sent: None,
        }
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.payload
    }

    pub fn set_payload(&mut self, payload: T) {
        self.payload = payload;
    }

    pub fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }

    /// Whether a send at `now` would pass the `rate_limit` gate.
    pub fn is_due(&self, now: Instant, rate_limit: Duration) -> bool {
        if rate_limit.as_ticks() == 0 {
            return true;
        }
        match self.last_sent {
            None => true,
            Some(last) => now
                .checked_duration_since(last)
                .is_some_and(|elapsed| elapsed >= rate_limit),
        }
    }

    /// Send the packet unconditionally.
    ///
    /// Sits outside the rate-limit window: `last_sent` is left as is, so a
    /// following [`serialize_at`](Self::serialize_at) is gated only by earlier
    /// gated sends. Use [`serialize_forced_at`](Self::serialize_forced_at) when an
    /// out-of-band send should restart the window.
    pub fn serialize<S: ByteSink + ?Sized>(
        &self,
        sink: &mut S,
    ) -> Result<(), SendError<S::Error>> {
        sink.send_frame(self.id, self.payload.as_bytes())
    }

    /// Send the packet if at least `rate_limit` elapsed since the last send
    /// (a zero limit always sends). Returns whether the packet went out; the
    /// timestamp only moves when it did.
    pub fn serialize_at<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
        now: Instant,
        rate_limit: Duration,
    ) -> Result<bool, SendError<S::Error>> {
        if !self.is_due(now, rate_limit) {
            return Ok(false);
        }
        self.serialize_forced_at(sink, now)?;
        Ok(true)
    }

    /// Send the packet regardless of the gate and record `now` as the last send.
    pub fn serialize_forced_at<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
        now: Instant,
    ) -> Result<(), SendError<S::Error>> {
        self.serialize(sink)?;
        self.last_sent = Some(now);
        Ok(())
    }
}
