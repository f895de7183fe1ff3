//! `ByteSink` extension providing a high-level API to emit frames: it encodes
//! the `(type, id, payload)` triple into a stack buffer and hands the whole
//! frame to the sink in one write, followed by a flush.
use crate::{
    core::PacketId,
    error::SendError,
    infra::codec::frame::EncodedFrame,
    protocol::transport::traits::byte_sink::ByteSink,
};

/// Trait extending `ByteSink` with frame-level sending.
pub trait FrameSender: ByteSink {
    /// Encode and send one frame.
    ///
    /// # Errors
    ///
    /// - [`SendError::Frame`] when the payload exceeds 255 bytes
    /// - [`SendError::Sink`] when the sink rejects the write or the flush
    fn send_frame(&mut self, id: PacketId, payload: &[u8]) -> Result<(), SendError<Self::Error>>;
}

impl<S: ByteSink + ?Sized> FrameSender for S {
    fn send_frame(&mut self, id: PacketId, payload: &[u8]) -> Result<(), SendError<Self::Error>> {
        let frame = EncodedFrame::encode(id, payload)?;
        self.write(frame.as_bytes()).map_err(SendError::Sink)?;
        self.flush().map_err(SendError::Sink)
    }
}
