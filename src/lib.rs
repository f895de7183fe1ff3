//! `carlink` library: the protocol core of an in-vehicle gateway that bridges a
//! host-facing serial link and a CAN bus. The crate exposes the infrastructure
//! modules (bit fields, frame codec) and the protocol logic (stream parsing,
//! typed packets, CAN filter registry, host commands, and the control loop).
#![no_std]
#[cfg(test)]
extern crate std;
//==================================================================================
/// Packet identities, reserved identifiers, and the sniffer payload layout.
pub mod core;
/// Errors raised by bit fields, the frame codec, the gateway, and host commands.
pub mod error;
/// Endianness-free bit fields and the `{ type id [len payload] }` frame encoder.
pub mod infra;
/// Host link parsing, typed packets, CAN gateway, and the bridge control loop.
pub mod protocol;
//==================================================================================
