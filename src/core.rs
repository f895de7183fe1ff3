//! Core data types shared by the codec, the host link, and the CAN gateway.
use crate::infra::codec::{bits::BitField, traits::PacketPayload};

//==================================================================================CONSTANTS
/// Number of data bytes carried by a classic CAN frame.
pub const CAN_DATA_LEN: usize = 8;

/// Default capacity of the CAN filter registry.
pub const REGISTRY_CAPACITY: usize = 50;

/// Default size of the host link scratch buffer.
pub const SCRATCH_CAPACITY: usize = 128;

//==================================================================================PACKET_ID
/// `(type, id)` pair identifying a frame for protocol dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketId {
    /// Packet family (`type` byte on the wire).
    pub kind: u8,
    /// Member of the family (`id` byte on the wire).
    pub id: u8,
}

impl PacketId {
    pub const fn new(kind: u8, id: u8) -> Self {
        Self { kind, id }
    }
}

/// Reserved identities understood or emitted by the core.
pub mod ids {
    use super::PacketId;

    /// Host command family controlling the device itself.
    pub const SYSTEM: u8 = 0x61;
    /// CAN family: sniff/delta events and filter configuration.
    pub const CAN: u8 = 0x62;
    /// Application-defined events routed to the user listener.
    pub const USER: u8 = 0x63;
    /// Error events reported to the host.
    pub const ERROR: u8 = 0x65;
    /// Device-originated application events.
    pub const EVENT: u8 = 0x73;

    /// CAN sniff or delta event (device to host).
    pub const CAN_EVENT: PacketId = PacketId::new(CAN, 0x01);
    /// Register a byte-mask filter (host to device).
    pub const CAN_ADD_FILTER: PacketId = PacketId::new(CAN, 0x02);
    /// Remove a byte-mask filter (host to device).
    pub const CAN_REMOVE_FILTER: PacketId = PacketId::new(CAN, 0x03);
    /// Put a frame on the CAN bus (host to device).
    pub const CAN_TRANSMIT: PacketId = PacketId::new(CAN, 0x04);

    pub const START_SNIFFER: PacketId = PacketId::new(SYSTEM, 0x0A);
    pub const STOP_SNIFFER: PacketId = PacketId::new(SYSTEM, 0x0B);
    /// Link speed change, `<baud: u32>`. Echoed back before the switch.
    pub const SET_BAUD_RATE: PacketId = PacketId::new(SYSTEM, 0x72);

    /// CAN configuration payload could not be read.
    pub const CONFIG_READ_ERROR: PacketId = PacketId::new(ERROR, 0x02);
    /// Filter registry is at capacity.
    pub const REGISTRY_FULL_ERROR: PacketId = PacketId::new(ERROR, 0x03);
    /// Host sent a command the device does not know.
    pub const UNKNOWN_COMMAND_ERROR: PacketId = PacketId::new(ERROR, 0x04);
    /// The bus driver refused or failed a transmit.
    pub const CAN_TRANSMIT_ERROR: PacketId = PacketId::new(ERROR, 0x33);

    /// Application event trigger (device to host).
    pub const APP_EVENT: PacketId = PacketId::new(EVENT, 0x72);
}

//==================================================================================CAN_DATA
/// Sniffer payload: the CAN identifier as a big-endian `u32` followed by the
/// eight data bytes, zero-padded past the frame length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanData {
    raw: [u8; 4 + CAN_DATA_LEN],
}

impl CanData {
    /// Bits 0..32 of the payload.
    pub const CAN_ID: BitField = BitField::new(0, 32);

    pub const fn new() -> Self {
        Self {
            raw: [0; 4 + CAN_DATA_LEN],
        }
    }

    /// Build the payload for a received frame. Bytes at positions `>= len` are zeroed.
    pub fn from_frame(can_id: u32, data: &[u8; CAN_DATA_LEN], len: usize) -> Self {
        let mut payload = Self::new();
        payload.set_can_id(can_id);
        for (i, slot) in payload.data_mut().iter_mut().enumerate() {
            *slot = if i < len { data[i] } else { 0x00 };
        }
        payload
    }

    pub fn can_id(&self) -> u32 {
        Self::CAN_ID.read(&self.raw).unwrap_or_default() as u32
    }

    pub fn set_can_id(&mut self, can_id: u32) {
        Self::CAN_ID.write(&mut self.raw, can_id as u64).ok();
    }

    pub fn data(&self) -> &[u8] {
        &self.raw[4..]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.raw[4..]
    }
}

// The identifier field must stay inside the payload for the accessors above to be infallible.
const _: () = assert!(CanData::CAN_ID.fits(4 + CAN_DATA_LEN));

impl PacketPayload for CanData {
    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.raw
    }
}
