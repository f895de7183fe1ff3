//! Host link: incremental frame recovery from the serial byte stream and
//! typed packets bound to a stable `(type, id)` identity.
pub mod packet;
pub mod parser;
