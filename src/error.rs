//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (bit field access, frame
//! encoding, filter registration, host command decoding, etc.).
use crate::core::PacketId;
use thiserror_no_std::Error;

//==================================================================================BITFIELD_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised by a bit field descriptor or one of its compound operations.
pub enum BitFieldError {
    /// Width outside the supported `1..=64` range.
    #[error("Invalid bit width: {asked}")]
    InvalidWidth { asked: u32 },
    /// The descriptor reaches past the end of the backing buffer.
    #[error("Field out of bounds -> end bit: {end_bit}, available bits: {available}")]
    OutOfBounds { end_bit: usize, available: usize },
    /// `first_bit + bit_width` does not fit the bit index range.
    #[error("Field position overflow -> first bit: {first_bit}, width: {bit_width}")]
    PositionOverflow { first_bit: u32, bit_width: u32 },
    /// Compound division or remainder with a zero divisor.
    #[error("Division by zero on a bit field")]
    DivisionByZero,
}

//==================================================================================BITREADER_ERRORS
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised during big-endian cursor reads.
pub enum BitReaderError {
    /// Attempted to read past the end of the buffer.
    #[error("Attempted to read out of bounds -> asked: {asked}, available: {available}")]
    OutOfBounds { asked: usize, available: usize },
    /// Requested more bits than the target type can hold.
    #[error("Cannot read more than {max} bits. Requested: {asked}")]
    TooLongForType { max: u8, asked: u8 },
    /// Cursor is not aligned on a byte boundary when required.
    #[error("Non aligned bit. Cursor: {cursor}")]
    NonAlignedBit { cursor: usize },
}

//==================================================================================BITWRITER_ERRORS
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised during big-endian cursor writes.
pub enum BitWriterError {
    /// Attempted to write beyond the provided capacity.
    #[error("Attempted to write out of bounds -> asked: {asked}, available: {available}")]
    OutOfBounds { asked: usize, available: usize },
    /// Field is too large for the provided type.
    #[error("Cannot write more than {max} bits. Requested: {asked}")]
    TooLongForType { max: u8, asked: u8 },
    /// Cursor is not aligned on a byte boundary when the operation requires it.
    #[error("Non aligned bit. Cursor: {cursor}")]
    NonAlignedBit { cursor: usize },
}

//================================================================================CODEC_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Issues encountered while encoding a frame.
pub enum FrameError {
    /// Payloads are limited to 255 bytes by the one-byte length field.
    #[error("Payload too long: {len} bytes")]
    PayloadTooLong { len: usize },
    /// Output buffer cannot hold the encoded frame.
    #[error("Buffer too small -> needed: {needed}, available: {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

#[derive(Debug, Error)]
/// Failures while pushing a frame to the host link.
pub enum SendError<E: core::fmt::Debug> {
    /// Frame could not be encoded.
    #[error("Frame encoding failed: {0}")]
    Frame(FrameError),
    /// The byte sink rejected the write.
    #[error("Sink error: {0:?}")]
    Sink(E),
}

impl<E: core::fmt::Debug> From<FrameError> for SendError<E> {
    fn from(err: FrameError) -> Self {
        SendError::Frame(err)
    }
}

//================================================================================GATEWAY_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised by the CAN filter registry.
pub enum GatewayError {
    /// No free slot left in the registry.
    #[error("Filter registry full (capacity {capacity})")]
    RegistryFull { capacity: usize },
}

//================================================================================COMMAND_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while decoding a host command.
pub enum CommandError {
    /// Payload ended before every field could be read.
    #[error("Truncated command payload: {0}")]
    Truncated(BitReaderError),
    /// Data length of a transmit command is larger than a CAN frame.
    #[error("Invalid CAN data length: {len}")]
    InvalidDataLength { len: u8 },
    /// No command is bound to this identity.
    #[error("Unknown command {id:?}")]
    Unknown { id: PacketId },
}

impl From<BitReaderError> for CommandError {
    fn from(err: BitReaderError) -> Self {
        CommandError::Truncated(err)
    }
}

//================================================================================BRIDGE_ERROR
#[derive(Debug, Error)]
/// Failures surfaced by one iteration of the bridge control loop.
pub enum BridgeError<R: core::fmt::Debug, W: core::fmt::Debug, B: core::fmt::Debug> {
    /// Reading from the host link failed.
    #[error("Host link read error: {0:?}")]
    LinkRead(R),
    /// Writing to the host link failed.
    #[error("Host link write error: {0}")]
    LinkWrite(SendError<W>),
    /// The CAN bus reported a receive error.
    #[error("CAN bus receive error: {0:?}")]
    BusReceive(B),
}
