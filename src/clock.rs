//! Monotonic millisecond clock for note timestamps.

use std::time::Instant;

/// Millisecond clock whose origin is 1 ms, so no reading is ever zero.
///
/// Zero is the "empty slot" sentinel in the note buffer.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub const ORIGIN_MS: f64 = 1.0;

    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Current time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        Self::ORIGIN_MS + self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
