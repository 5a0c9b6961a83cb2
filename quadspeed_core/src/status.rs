//! Result of a single estimation cycle.

use quadspeed_traits::Direction;

/// Why a cycle produced no new values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// Less than the minimum window has elapsed since the baseline.
    WindowTooShort,
    /// No accepted edges yet, but the stop timeout has not expired.
    AwaitingEdges,
}

/// Raw and filtered values computed by an `Updated` cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Accepted edges in the window.
    pub edges: u32,
    /// Window length in seconds.
    pub window_s: f64,
    /// RPM before filtering, after saturation.
    pub raw_rpm: f32,
    /// Speed before filtering, after the plausibility hold.
    pub raw_speed: f32,
    /// True when the computed speed was implausible and the previous one was reused.
    pub speed_held: bool,
    pub rpm: f32,
    pub speed: f32,
    /// Distance added by this window, metres.
    pub distance_m: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    Updated(Measurement),
    Deferred(DeferReason),
    /// No edges for the stop timeout; outputs were zeroed.
    Stopped,
}
