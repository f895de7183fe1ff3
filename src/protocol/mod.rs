//! Protocol layer: the host link (framing, parsing, typed packets), the host
//! command set, the CAN gateway, and the bridge control loop.
pub mod bridge;
pub mod gateway;
pub mod host;
pub mod link;
pub mod transport;
