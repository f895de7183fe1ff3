//! In-memory representation of a classic CAN frame, and conversions to and
//! from any [`embedded_can::Frame`] implementation.
use crate::core::CAN_DATA_LEN;
use embedded_can::{ExtendedId, Frame, Id, StandardId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Raw CAN frame as read from, or written to, the bus driver.
pub struct CanFrame {
    /// Raw identifier (11-bit standard or 29-bit extended) stored inside a `u32`.
    pub id: u32,
    /// Whether `id` is an extended identifier.
    pub extended: bool,
    /// Payload buffer. Bytes past `len` are zero.
    pub data: [u8; CAN_DATA_LEN],
    /// Number of valid payload bytes (Data Length Code, 0 to 8).
    pub len: usize,
}

impl CanFrame {
    /// Build a frame from a payload slice; returns `None` past eight bytes.
    pub fn new(id: u32, extended: bool, payload: &[u8]) -> Option<Self> {
        if payload.len() > CAN_DATA_LEN {
            return None;
        }
        let mut data = [0u8; CAN_DATA_LEN];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self {
            id,
            extended,
            data,
            len: payload.len(),
        })
    }

    /// Copy a driver frame. Remote frames carry no data and come out empty.
    pub fn from_frame<F: Frame>(frame: &F) -> Self {
        let (id, extended) = raw_id(frame.id());
        let payload = frame.data();
        let len = payload.len().min(CAN_DATA_LEN);
        let mut data = [0u8; CAN_DATA_LEN];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            id,
            extended,
            data,
            len,
        }
    }

    /// Build a driver data frame. Returns `None` when the identifier does not
    /// fit its declared width.
    pub fn to_frame<F: Frame>(&self) -> Option<F> {
        let id: Id = if self.extended {
            ExtendedId::new(self.id)?.into()
        } else {
            u16::try_from(self.id).ok().and_then(StandardId::new)?.into()
        };
        F::new(id, self.payload())
    }

    /// Valid payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len.min(CAN_DATA_LEN)]
    }
}

/// Split an `embedded_can::Id` into its raw value and the extended flag.
pub fn raw_id(id: Id) -> (u32, bool) {
    match id {
        Id::Standard(id) => (id.as_raw() as u32, false),
        Id::Extended(id) => (id.as_raw(), true),
    }
}
