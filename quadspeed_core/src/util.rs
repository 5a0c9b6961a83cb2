//! Common time/period helpers for quadspeed_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Compute the period in microseconds for a given rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Period of a rate expressed in ticks of a `frequency_hz` counter, at least 1.
#[inline]
pub fn period_ticks(hz: u32, frequency_hz: u32) -> u64 {
    (u64::from(frequency_hz) / u64::from(hz.max(1))).max(1)
}
