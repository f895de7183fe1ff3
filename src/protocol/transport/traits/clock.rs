//! Monotonic time source used by rate-limited packets.
use embassy_time::Instant;

/// Clock abstraction; on embassy targets `embassy_time::Instant::now` fits directly.
pub trait Clock {
    /// Current monotonic time.
    fn now(&self) -> Instant;
}
