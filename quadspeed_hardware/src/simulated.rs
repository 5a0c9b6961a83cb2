//! Synthetic quadrature encoder.
use std::time::{Duration, Instant};

use quadspeed_traits::{Clock, Direction, MonotonicClock, QuadratureSensor};

use crate::error::{HwError, Result};

/// Channel states in forward order: 11 -> 01 -> 00 -> 10.
const FORWARD_CYCLE: [(bool, bool); 4] = [(true, true), (false, true), (false, false), (true, false)];

/// Encoder that produces a clean quadrature sequence for a commanded shaft
/// speed, paced by a `Clock`.
///
/// With the default `MonotonicClock` edges arrive in real time; with a test
/// clock `wait_for_edge` advances simulated time instead of sleeping.
#[derive(Debug)]
pub struct SimulatedEncoder<C: Clock = MonotonicClock> {
    clock: C,
    edges_per_rotation: u32,
    edge_period: Option<Duration>,
    direction: Direction,
    phase: usize,
    next_edge_at: Option<Instant>,
    edges_emitted: u64,
}

impl SimulatedEncoder<MonotonicClock> {
    pub fn new(edges_per_rotation: u32, rpm: f32, direction: Direction) -> Result<Self> {
        Self::with_clock(MonotonicClock::new(), edges_per_rotation, rpm, direction)
    }
}

impl<C: Clock> SimulatedEncoder<C> {
    pub fn with_clock(
        clock: C,
        edges_per_rotation: u32,
        rpm: f32,
        direction: Direction,
    ) -> Result<Self> {
        if edges_per_rotation == 0 {
            return Err(HwError::InvalidConfig("edges_per_rotation must be > 0"));
        }
        let mut enc = Self {
            clock,
            edges_per_rotation,
            edge_period: None,
            direction,
            phase: 0,
            next_edge_at: None,
            edges_emitted: 0,
        };
        enc.set_rpm(rpm)?;
        Ok(enc)
    }

    /// Change the commanded speed. Zero (or `Direction::Stopped`) halts edge
    /// generation without losing the current phase.
    pub fn set_rpm(&mut self, rpm: f32) -> Result<()> {
        if !rpm.is_finite() || rpm < 0.0 {
            return Err(HwError::InvalidConfig("rpm must be finite and >= 0"));
        }
        self.edge_period = if rpm == 0.0 {
            None
        } else {
            let edges_per_sec = f64::from(rpm) / 60.0 * f64::from(self.edges_per_rotation);
            Some(Duration::from_secs_f64(1.0 / edges_per_sec))
        };
        self.next_edge_at = None;
        tracing::debug!(
            rpm,
            edge_period_us = self.edge_period.map(|p| p.as_micros() as u64),
            "simulated encoder speed set"
        );
        Ok(())
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Edges produced so far.
    pub fn edges_emitted(&self) -> u64 {
        self.edges_emitted
    }

    fn step(&mut self) {
        self.phase = match self.direction {
            Direction::Forward => (self.phase + 1) % FORWARD_CYCLE.len(),
            Direction::Reverse => (self.phase + FORWARD_CYCLE.len() - 1) % FORWARD_CYCLE.len(),
            Direction::Stopped => self.phase,
        };
        self.edges_emitted += 1;
    }
}

impl<C: Clock> QuadratureSensor for SimulatedEncoder<C> {
    fn wait_for_edge(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let period = match (self.edge_period, self.direction) {
            (Some(p), Direction::Forward | Direction::Reverse) => p,
            _ => {
                self.clock.sleep(timeout);
                return Ok(false);
            }
        };
        let now = self.clock.now();
        let due = match self.next_edge_at {
            // a consumer that fell behind resynchronises instead of bursting
            Some(t) if t >= now => t,
            _ => now + period,
        };
        let wait = due.saturating_duration_since(now);
        if wait > timeout {
            self.next_edge_at = Some(due);
            self.clock.sleep(timeout);
            return Ok(false);
        }
        self.clock.sleep(wait);
        self.step();
        self.next_edge_at = Some(due + period);
        Ok(true)
    }

    fn read_channels(&mut self) -> std::result::Result<(bool, bool), Box<dyn std::error::Error + Send + Sync>> {
        Ok(FORWARD_CYCLE[self.phase])
    }
}
