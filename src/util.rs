//! Small helpers shared across the storage engine.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current timestamp since the Unix epoch.
pub fn get_timestamp() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
}

/// Divides `a` by `b`, rounding up.
pub fn ceil_division(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

/// Structure representing a number of bytes, for human-readable display.
pub struct ByteSize(pub u64);

impl fmt::Display for ByteSize {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [&str; 7] = ["bytes", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

        let mut order = 0;
        let mut value = self.0;
        while value >= 1024 && order + 1 < UNITS.len() {
            value /= 1024;
            order += 1;
        }

        write!(fmt, "{} {}", value, UNITS[order])
    }
}
