//! Transport layer: the in-memory CAN frame, and the traits abstracting the
//! host link (byte source and sink), the clock, and frame emission.
//!
//! The bus driver itself is any [`embedded_can::nb::Can`] implementation:
//! `receive()` returning `WouldBlock` means no frame is pending, which is how
//! the control loop avoids reading the bus speculatively.

pub mod can_frame;
pub mod traits;
