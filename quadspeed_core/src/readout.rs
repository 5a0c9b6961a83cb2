//! Published values polled by displays.
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};

use quadspeed_config::SpeedUnit;
use quadspeed_traits::{Direction, DisplayFrame};

/// Single-writer, many-reader store of the latest filtered values.
///
/// Every field is one atomic word, so readers never see a half-written
/// value. Distance is an `f64` held as raw bits.
#[derive(Debug, Default)]
pub(crate) struct Readout {
    speed: AtomicU32,
    rpm: AtomicU32,
    direction: AtomicU8,
    distance: AtomicU64,
}

impl Readout {
    pub(crate) fn publish(&self, speed: f32, rpm: f32, direction: Direction) {
        self.speed.store(speed.to_bits(), Ordering::Relaxed);
        self.rpm.store(rpm.to_bits(), Ordering::Relaxed);
        self.direction.store(direction.as_u8(), Ordering::Relaxed);
    }

    pub(crate) fn add_distance(&self, metres: f64) {
        // a concurrent reset makes the CAS fail and the increment lands on zero
        let _ = self
            .distance
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + metres).to_bits())
            });
    }

    fn reset_distance(&self) {
        self.distance.store(0.0f64.to_bits(), Ordering::Release);
    }

    fn speed(&self) -> f32 {
        f32::from_bits(self.speed.load(Ordering::Relaxed))
    }

    fn rpm(&self) -> f32 {
        f32::from_bits(self.rpm.load(Ordering::Relaxed))
    }

    fn direction(&self) -> Direction {
        Direction::from_u8(self.direction.load(Ordering::Relaxed))
    }

    fn distance(&self) -> f64 {
        f64::from_bits(self.distance.load(Ordering::Acquire))
    }
}

/// Cloneable read access to a meter's published values.
///
/// Safe to hand to any number of threads; the only mutation offered is
/// `reset_distance`.
#[derive(Debug, Clone)]
pub struct ReadoutHandle {
    inner: Arc<Readout>,
    unit: SpeedUnit,
}

impl ReadoutHandle {
    pub(crate) fn new(inner: Arc<Readout>, unit: SpeedUnit) -> Self {
        Self { inner, unit }
    }

    pub(crate) fn store(&self) -> &Readout {
        &self.inner
    }

    /// Filtered linear speed in the configured unit.
    pub fn speed(&self) -> f32 {
        self.inner.speed()
    }

    /// Filtered shaft speed in revolutions per minute.
    pub fn rpm(&self) -> f32 {
        self.inner.rpm()
    }

    /// Travelled distance in metres since start or the last reset.
    pub fn distance(&self) -> f64 {
        self.inner.distance()
    }

    pub fn direction(&self) -> Direction {
        self.inner.direction()
    }

    pub fn reset_distance(&self) {
        self.inner.reset_distance();
    }

    pub fn unit(&self) -> SpeedUnit {
        self.unit
    }

    pub fn frame(&self) -> DisplayFrame {
        DisplayFrame {
            rpm: self.rpm(),
            speed: self.speed(),
            speed_unit: self.unit.label(),
            distance_m: self.distance(),
            direction: self.direction(),
        }
    }
}
