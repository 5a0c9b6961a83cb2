pub mod clock;
pub mod ticks;

pub use clock::{Clock, MonotonicClock};
pub use ticks::{ManualTicks, MonotonicTicks, TickSource, counter_mask};

use std::fmt;

/// Discrete rotation direction as published to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Direction {
    #[default]
    Stopped = 0,
    Forward = 1,
    Reverse = 2,
}

impl Direction {
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of `as_u8`; unknown codes map to `Stopped`.
    #[inline]
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Direction::Forward,
            2 => Direction::Reverse,
            _ => Direction::Stopped,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Stopped => "stopped",
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-channel quadrature input.
pub trait QuadratureSensor {
    /// Block up to `timeout` for a level change on either channel.
    ///
    /// Returns `Ok(true)` when an edge was observed, `Ok(false)` on timeout.
    fn wait_for_edge(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Current `(channel_a, channel_b)` levels.
    fn read_channels(&mut self) -> Result<(bool, bool), Box<dyn std::error::Error + Send + Sync>>;
}

/// One refresh worth of readout values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayFrame {
    pub rpm: f32,
    pub speed: f32,
    pub speed_unit: &'static str,
    pub distance_m: f64,
    pub direction: Direction,
}

/// Consumer of readout frames (console, LCD, ...).
pub trait Display {
    fn show(&mut self, frame: &DisplayFrame)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<D: Display + ?Sized> Display for Box<D> {
    fn show(
        &mut self,
        frame: &DisplayFrame,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).show(frame)
    }
}

impl<S: QuadratureSensor + ?Sized> QuadratureSensor for Box<S> {
    fn wait_for_edge(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).wait_for_edge(timeout)
    }

    fn read_channels(&mut self) -> Result<(bool, bool), Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_channels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_code_roundtrip() {
        for d in [Direction::Stopped, Direction::Forward, Direction::Reverse] {
            assert_eq!(Direction::from_u8(d.as_u8()), d);
        }
        assert_eq!(Direction::from_u8(7), Direction::Stopped);
        assert_eq!(Direction::Reverse.to_string(), "reverse");
    }
}
