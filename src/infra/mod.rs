//! Infrastructure shared by the protocol layer: bit-level field access and
//! the host link frame encoder.
pub mod codec;
