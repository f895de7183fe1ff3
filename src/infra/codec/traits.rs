//! Public traits exposed by the codec layer. They decouple fixed-layout
//! payload types from the framing logic and provide a uniform API to
//! typed packets.

//==================================================================================PACKET_PAYLOAD
/// Fixed-layout payload carried by a [`TypedPacket`](crate::protocol::link::packet::TypedPacket).
///
/// The byte view is the wire representation: it is sent verbatim as the frame
/// payload, and fields inside it are usually accessed through
/// [`BitField`](crate::infra::codec::bits::BitField) descriptors so the layout
/// stays big-endian on every host.
///
/// ```rust
/// use carlink::infra::codec::{bits::BitField, traits::PacketPayload};
///
/// #[derive(Clone, Default)]
/// struct Climate([u8; 3]);
///
/// impl PacketPayload for Climate {
///     fn as_bytes(&self) -> &[u8] { &self.0 }
///     fn as_bytes_mut(&mut self) -> &mut [u8] { &mut self.0 }
/// }
///
/// const IS_AC_ON: BitField = BitField::new(0, 1);
/// let mut climate = Climate::default();
/// IS_AC_ON.write(climate.as_bytes_mut(), 1).unwrap();
/// assert_eq!(climate.as_bytes()[0], 0x80);
/// ```
pub trait PacketPayload {
    /// Serialized view of the payload.
    fn as_bytes(&self) -> &[u8];
    /// Mutable view used for in-place field updates.
    fn as_bytes_mut(&mut self) -> &mut [u8];
}

/// Raw byte arrays are their own wire representation. `[u8; 0]` is the empty payload.
impl<const N: usize> PacketPayload for [u8; N] {
    fn as_bytes(&self) -> &[u8] {
        self
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}
