//! Binary codecs: big-endian bit fields, the `{ type id [len payload] }`
//! frame encoder, and the payload trait binding fixed layouts to packets.
pub mod bits;
pub mod frame;
pub mod traits;
