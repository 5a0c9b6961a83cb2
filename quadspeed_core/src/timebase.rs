//! Wrap-safe arithmetic over a free-running down-counter.
use std::time::Duration;

use quadspeed_traits::{TickSource, counter_mask};

/// A raw counter sample.
///
/// Samples are only meaningful relative to each other; compare them through
/// [`TimeBase::elapsed`], never by ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticks(u32);

impl Ticks {
    #[inline]
    pub const fn from_raw(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Ticks from `earlier` to `later` on a down-counter masked by `mask`.
///
/// Modular subtraction, so any pair of samples within one wrap period gives
/// the true distance regardless of wraparound.
#[inline]
pub const fn elapsed_ticks(earlier: u32, later: u32, mask: u32) -> u32 {
    earlier.wrapping_sub(later) & mask
}

#[derive(Debug, Clone)]
pub struct TimeBase<T> {
    source: T,
    mask: u32,
    frequency_hz: u32,
}

impl<T: TickSource> TimeBase<T> {
    pub fn new(source: T) -> Self {
        let mask = counter_mask(source.width_bits());
        let frequency_hz = source.frequency_hz().max(1);
        Self {
            source,
            mask,
            frequency_hz,
        }
    }

    #[inline]
    pub fn now(&self) -> Ticks {
        Ticks(self.source.now() & self.mask)
    }

    #[inline]
    pub fn elapsed(&self, earlier: Ticks, later: Ticks) -> u32 {
        elapsed_ticks(earlier.0, later.0, self.mask)
    }

    #[inline]
    pub fn ticks_to_secs(&self, ticks: u32) -> f64 {
        f64::from(ticks) / f64::from(self.frequency_hz)
    }

    /// Whole ticks in `d`, saturating at `u64::MAX`.
    #[inline]
    pub fn duration_to_ticks(&self, d: Duration) -> u64 {
        quadspeed_traits::ticks::duration_to_ticks(d, self.frequency_hz)
    }

    /// Longest span `elapsed` can represent before aliasing.
    pub fn wrap_period(&self) -> Duration {
        let ticks = u64::from(self.mask) + 1;
        Duration::from_secs_f64(ticks as f64 / f64::from(self.frequency_hz))
    }

    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn source(&self) -> &T {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quadspeed_traits::ManualTicks;

    #[test]
    fn wraps_across_zero() {
        assert_eq!(elapsed_ticks(5, u32::MAX - 5, u32::MAX), 11);
    }

    #[test]
    fn plain_difference_without_wrap() {
        assert_eq!(elapsed_ticks(1_000, 400, u32::MAX), 600);
        assert_eq!(elapsed_ticks(7, 7, u32::MAX), 0);
    }

    #[test]
    fn reduced_width_wraps_at_mask() {
        let mask = counter_mask(24);
        assert_eq!(elapsed_ticks(3, 0x00FF_FFFE, mask), 5);
        assert_eq!(elapsed_ticks(0x00FF_FFFF, 0, mask), 0x00FF_FFFF);
    }

    #[test]
    fn timebase_converts_to_seconds() {
        let src = ManualTicks::new(u32::MAX, 1_000_000, 32);
        let tb = TimeBase::new(src.clone());
        let t0 = tb.now();
        src.advance(Duration::from_millis(250));
        let t1 = tb.now();
        let dt = tb.elapsed(t0, t1);
        assert_eq!(dt, 250_000);
        assert!((tb.ticks_to_secs(dt) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn wrap_period_of_16_bit_counter() {
        let tb = TimeBase::new(ManualTicks::new(0, 65_536, 16));
        assert_eq!(tb.wrap_period(), Duration::from_secs(1));
    }

    proptest! {
        #[test]
        fn elapsed_recovers_any_step(start in any::<u32>(), step in any::<u32>(), width in 1u8..=32) {
            let mask = counter_mask(width);
            let step = step & mask;
            let earlier = start & mask;
            let later = earlier.wrapping_sub(step) & mask;
            prop_assert_eq!(elapsed_ticks(earlier, later, mask), step);
        }
    }
}
