//! Tick helpers
//!
//! Timestamps in the file are 64-bit tick counts: 100 ns intervals since
//! 0001-01-01T00:00:00 UTC. The store itself never interprets them beyond
//! comparing, so callers are free to use another unit consistently.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Ticks in one second
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Nanoseconds in one tick
const NANOS_PER_TICK: u64 = 100;

/// Tick count of 1970-01-01T00:00:00 UTC
pub const UNIX_EPOCH_TICKS: u64 = 621_355_968_000_000_000;

/// Convert a wall-clock time into ticks.
///
/// Times before the tick epoch clamp to 0.
pub fn from_system_time(time: SystemTime) -> u64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => UNIX_EPOCH_TICKS.saturating_add(duration_to_ticks(since)),
        Err(before) => UNIX_EPOCH_TICKS.saturating_sub(duration_to_ticks(before.duration())),
    }
}

/// Convert ticks back into a wall-clock time.
pub fn to_system_time(ticks: u64) -> SystemTime {
    if ticks >= UNIX_EPOCH_TICKS {
        UNIX_EPOCH + ticks_to_duration(ticks - UNIX_EPOCH_TICKS)
    } else {
        UNIX_EPOCH - ticks_to_duration(UNIX_EPOCH_TICKS - ticks)
    }
}

/// Current time in ticks
pub fn now() -> u64 {
    from_system_time(SystemTime::now())
}

fn duration_to_ticks(duration: Duration) -> u64 {
    let ticks = duration.as_nanos() / u128::from(NANOS_PER_TICK);
    u64::try_from(ticks).unwrap_or(u64::MAX)
}

fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::new(
        ticks / TICKS_PER_SECOND,
        ((ticks % TICKS_PER_SECOND) * NANOS_PER_TICK) as u32,
    )
}
