//! Abstraction traits used by the transport layer (host link, clock, and frame sender).
pub mod byte_sink;
pub mod byte_source;
pub mod clock;
pub mod frame_sender;
