//! Write half of the host link.

/// Contract to push bytes towards the host.
///
/// A frame is always handed over in a single `write` call followed by
/// `flush`, so an implementation that forwards whole writes never interleaves
/// two frames.
pub trait ByteSink {
    type Error: core::fmt::Debug;
    /// Queue every byte of `bytes`, or fail without a partial frame being visible.
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
    /// Push queued bytes out. Called once per frame boundary.
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    type Error = S::Error;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }
}

/// Fixed-capacity in-memory sink; the write fails when the frame does not fit.
impl<const N: usize> ByteSink for heapless::Vec<u8, N> {
    type Error = ();

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.extend_from_slice(bytes)
    }
}
