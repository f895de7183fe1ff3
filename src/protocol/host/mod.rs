//! Host commands: the frames the host sends to configure the gateway, drive
//! the bus, or reach the application.
//!
//! | type   | id     | command        | payload                                          |
//! |--------|--------|----------------|--------------------------------------------------|
//! | `0x61` | `0x0A` | start sniffer  | empty                                            |
//! | `0x61` | `0x0B` | stop sniffer   | empty                                            |
//! | `0x61` | `0x72` | set baud rate  | `<baud: u32>`                                    |
//! | `0x62` | `0x02` | add filter     | `<can_id: u32><mask: u8>`                        |
//! | `0x62` | `0x03` | remove filter  | `<can_id: u32>`                                  |
//! | `0x62` | `0x04` | transmit frame | `<can_id: u32><extended: u8><len: u8><data>`     |
//! | `0x63` | any    | user event     | opaque, handed to the application                |
//!
//! Multi-byte fields are big-endian. Bytes past the last field are ignored.
use crate::{
    core::{ids, PacketId, CAN_DATA_LEN},
    error::{BitWriterError, CommandError},
    infra::codec::bits::{BitReader, BitWriter},
    protocol::transport::can_frame::CanFrame,
};

/// Decoded host command. User events borrow their payload from the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand<'a> {
    StartSniffer,
    StopSniffer,
    /// Switch the host link speed. The UART itself belongs to the application.
    SetBaudRate { baud: u32 },
    AddFilter { can_id: u32, mask: u8 },
    RemoveFilter { can_id: u32 },
    Transmit(CanFrame),
    UserEvent { id: u8, payload: &'a [u8] },
}

impl<'a> HostCommand<'a> {
    /// Decode the command carried by a frame.
    ///
    /// # Errors
    ///
    /// - [`CommandError::Truncated`] when the payload ends before a field
    /// - [`CommandError::InvalidDataLength`] when a transmit announces more than 8 bytes
    /// - [`CommandError::Unknown`] for an identity bound to no command
    pub fn decode(id: PacketId, payload: &'a [u8]) -> Result<Self, CommandError> {
        let mut reader = BitReader::new(payload);
        let command = match id {
            ids::START_SNIFFER => Self::StartSniffer,
            ids::STOP_SNIFFER => Self::StopSniffer,
            ids::SET_BAUD_RATE => Self::SetBaudRate {
                baud: reader.read_u32(32)?,
            },
            ids::CAN_ADD_FILTER => Self::AddFilter {
                can_id: reader.read_u32(32)?,
                mask: reader.read_u8(8)?,
            },
            ids::CAN_REMOVE_FILTER => Self::RemoveFilter {
                can_id: reader.read_u32(32)?,
            },
            ids::CAN_TRANSMIT => {
                let can_id = reader.read_u32(32)?;
                let extended = reader.read_u8(8)? != 0;
                let len = reader.read_u8(8)?;
                if len as usize > CAN_DATA_LEN {
                    return Err(CommandError::InvalidDataLength { len });
                }
                let data = reader.read_slice(len as usize)?;
                // len <= 8 was checked above
                let frame = CanFrame::new(can_id, extended, data)
                    .ok_or(CommandError::InvalidDataLength { len })?;
                Self::Transmit(frame)
            }
            PacketId {
                kind: ids::USER,
                id,
            } => Self::UserEvent { id, payload },
            _ => return Err(CommandError::Unknown { id }),
        };
        Ok(command)
    }

    /// Identity the command travels under.
    pub fn packet_id(&self) -> PacketId {
        match self {
            Self::StartSniffer => ids::START_SNIFFER,
            Self::StopSniffer => ids::STOP_SNIFFER,
            Self::SetBaudRate { .. } => ids::SET_BAUD_RATE,
            Self::AddFilter { .. } => ids::CAN_ADD_FILTER,
            Self::RemoveFilter { .. } => ids::CAN_REMOVE_FILTER,
            Self::Transmit(_) => ids::CAN_TRANSMIT,
            Self::UserEvent { id, .. } => PacketId::new(ids::USER, *id),
        }
    }

    /// Write the command payload into `out`, host side. Returns the identity
    /// and the number of bytes written.
    pub fn encode(&self, out: &mut [u8]) -> Result<(PacketId, usize), BitWriterError> {
        let mut writer = BitWriter::new(out);
        match self {
            Self::StartSniffer | Self::StopSniffer => {}
            Self::SetBaudRate { baud } => writer.write_u32(*baud, 32)?,
            Self::AddFilter { can_id, mask } => {
                writer.write_u32(*can_id, 32)?;
                writer.write_u8(*mask, 8)?;
            }
            Self::RemoveFilter { can_id } => writer.write_u32(*can_id, 32)?,
            Self::Transmit(frame) => {
                writer.write_u32(frame.id, 32)?;
                writer.write_u8(frame.extended as u8, 8)?;
                writer.write_u8(frame.len as u8, 8)?;
                writer.write_slice(frame.payload())?;
            }
            Self::UserEvent { payload, .. } => writer.write_slice(payload)?,
        }
        Ok((self.packet_id(), writer.byte_len()))
    }
}

impl CommandError {
    /// Error event reported to the host for this failure.
    pub fn report_id(&self) -> PacketId {
        match self {
            CommandError::Truncated(_) | CommandError::InvalidDataLength { .. } => {
                ids::CONFIG_READ_ERROR
            }
            CommandError::Unknown { .. } => ids::UNKNOWN_COMMAND_ERROR,
        }
    }
}
