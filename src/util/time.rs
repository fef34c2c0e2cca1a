//! Time utilities for the host tick clock

use std::time::{Duration, Instant};

/// Host simulation rate (ticks per second)
pub const TICKS_PER_SECOND: u64 = 20;

/// Default wall-clock length of one tick
pub const DEFAULT_TICK_MILLIS: u64 = 1_000 / TICKS_PER_SECOND;

/// Pre-fight countdown (2 seconds)
pub const COUNTDOWN_TICKS: u64 = 2 * TICKS_PER_SECOND;

/// Post-match cooldown (10 seconds)
pub const COOLDOWN_TICKS: u64 = 10 * TICKS_PER_SECOND;

/// Whole seconds covered by a tick count, rounded down
pub fn ticks_to_secs(ticks: u64) -> u64 {
    ticks / TICKS_PER_SECOND
}

/// Wall-clock duration of `ticks` at the given tick length
pub fn ticks_to_duration(ticks: u64, tick_millis: u64) -> Duration {
    Duration::from_millis(ticks.saturating_mul(tick_millis))
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delays_match_host_rate() {
        assert_eq!(ticks_to_secs(COUNTDOWN_TICKS), 2);
        assert_eq!(ticks_to_secs(COOLDOWN_TICKS), 10);
    }

    #[test]
    fn duration_scales_with_tick_length() {
        assert_eq!(ticks_to_duration(40, 50), Duration::from_secs(2));
        assert_eq!(ticks_to_duration(3, 0), Duration::ZERO);
        assert_eq!(ticks_to_duration(u64::MAX, 2), Duration::from_millis(u64::MAX));
    }
}
