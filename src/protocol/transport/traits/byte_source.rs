//! Read half of the host link.

/// Non-blocking byte source (typically a UART receive FIFO).
pub trait ByteSource {
    type Error: core::fmt::Debug;
    /// Return the next received byte, or `nb::Error::WouldBlock` when none is available.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    type Error = S::Error;

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        (**self).read_byte()
    }
}
