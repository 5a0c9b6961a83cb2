//! Free-running down-counter sources.
//!
//! A `TickSource` models the hardware timer the edge handler samples: a
//! `width_bits()`-wide counter decrementing at `frequency_hz()` and wrapping
//! from 0 back to `2^width_bits() - 1`. Hosts without such a timer use
//! `MonotonicTicks`; tests and trace replay use `ManualTicks`.
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crate::clock::Clock;

/// Nanoseconds per second, used for tick/duration conversions.
const NANOS_PER_SEC: u128 = 1_000_000_000;

pub trait TickSource {
    /// Current counter value, already masked to `width_bits()`.
    fn now(&self) -> u32;
    /// Counting frequency in Hz.
    fn frequency_hz(&self) -> u32;
    /// Counter width in bits (1..=32).
    fn width_bits(&self) -> u8 {
        32
    }
}

/// Mask selecting the low `width_bits` bits; widths are clamped to 1..=32.
#[inline]
pub fn counter_mask(width_bits: u8) -> u32 {
    let w = width_bits.clamp(1, 32) as u32;
    u32::MAX >> (32 - w)
}

/// Whole ticks covered by `d` at `frequency_hz`, truncated.
#[inline]
pub fn duration_to_ticks(d: Duration, frequency_hz: u32) -> u64 {
    let t = d.as_nanos() * u128::from(frequency_hz) / NANOS_PER_SEC;
    t.min(u128::from(u64::MAX)) as u64
}

/// Emulates a free-running down-counter on top of a monotonic `Clock`.
///
/// The counter starts at its maximum value when constructed and wraps exactly
/// like a hardware timer of the same width would.
#[derive(Debug, Clone)]
pub struct MonotonicTicks<C: Clock> {
    clock: C,
    origin: Instant,
    frequency_hz: u32,
    width_bits: u8,
}

impl<C: Clock> MonotonicTicks<C> {
    pub fn new(clock: C, frequency_hz: u32, width_bits: u8) -> Self {
        let origin = clock.now();
        Self {
            clock,
            origin,
            frequency_hz: frequency_hz.max(1),
            width_bits: width_bits.clamp(1, 32),
        }
    }
}

impl<C: Clock> TickSource for MonotonicTicks<C> {
    #[inline]
    fn now(&self) -> u32 {
        let elapsed = self.clock.now().saturating_duration_since(self.origin);
        let ticks = duration_to_ticks(elapsed, self.frequency_hz);
        let mask = counter_mask(self.width_bits);
        mask.wrapping_sub(ticks as u32) & mask
    }

    fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    fn width_bits(&self) -> u8 {
        self.width_bits
    }
}

/// Settable down-counter shared between clones.
///
/// Cloning yields another handle onto the same counter, so a test (or the
/// trace replayer) can move time forward while the capture handle and the
/// meter both observe it.
#[derive(Debug, Clone)]
pub struct ManualTicks {
    value: Arc<AtomicU32>,
    frequency_hz: u32,
    width_bits: u8,
}

impl ManualTicks {
    /// Start the counter at `start` (masked to the counter width).
    pub fn new(start: u32, frequency_hz: u32, width_bits: u8) -> Self {
        let width_bits = width_bits.clamp(1, 32);
        Self {
            value: Arc::new(AtomicU32::new(start & counter_mask(width_bits))),
            frequency_hz: frequency_hz.max(1),
            width_bits,
        }
    }

    /// Overwrite the counter value.
    pub fn set(&self, value: u32) {
        self.value
            .store(value & counter_mask(self.width_bits), Ordering::Release);
    }

    /// Count down by `ticks`, wrapping at the counter width.
    pub fn advance_ticks(&self, ticks: u32) {
        let mask = counter_mask(self.width_bits);
        let _ = self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                Some(v.wrapping_sub(ticks) & mask)
            });
    }

    /// Count down by the number of ticks `d` spans.
    pub fn advance(&self, d: Duration) {
        let ticks = duration_to_ticks(d, self.frequency_hz);
        self.advance_ticks(ticks as u32);
    }
}

impl TickSource for ManualTicks {
    #[inline]
    fn now(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    fn width_bits(&self) -> u8 {
        self.width_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_clock::TestClock;

    #[test]
    fn mask_covers_requested_width() {
        assert_eq!(counter_mask(32), u32::MAX);
        assert_eq!(counter_mask(24), 0x00FF_FFFF);
        assert_eq!(counter_mask(1), 1);
        // out-of-range widths clamp
        assert_eq!(counter_mask(0), 1);
        assert_eq!(counter_mask(40), u32::MAX);
    }

    #[test]
    fn monotonic_ticks_count_down_from_max() {
        let clock = TestClock::new();
        let ticks = MonotonicTicks::new(clock.clone(), 1_000_000, 32);
        assert_eq!(ticks.now(), u32::MAX);
        clock.advance(Duration::from_millis(1));
        assert_eq!(ticks.now(), u32::MAX - 1_000);
    }

    #[test]
    fn monotonic_ticks_wrap_at_width() {
        let clock = TestClock::new();
        // 8-bit counter at 1 kHz wraps every 256 ms
        let ticks = MonotonicTicks::new(clock.clone(), 1_000, 8);
        clock.advance(Duration::from_millis(256));
        assert_eq!(ticks.now(), 0xFF);
        clock.advance(Duration::from_millis(255));
        assert_eq!(ticks.now(), 0);
    }

    #[test]
    fn manual_ticks_share_state_between_clones() {
        let a = ManualTicks::new(10, 1_000_000, 32);
        let b = a.clone();
        a.advance_ticks(15);
        assert_eq!(b.now(), u32::MAX - 4);
        b.advance(Duration::from_micros(6));
        assert_eq!(a.now(), u32::MAX - 10);
    }
}
