//! Edge capture: the sole writer of the shared measurement state.
use std::convert::Infallible;
use std::sync::Arc;

use quadspeed_traits::TickSource;

use crate::quadrature::{QuadratureState, decode};
use crate::shared::{Published, SharedMeasurement};
use crate::timebase::{TimeBase, Ticks};

/// What a single edge did to the shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Counted; carries the direction vote it contributed.
    Accepted(i8),
    /// Channel levels did not change.
    Duplicate,
    /// Arrived sooner than the noise floor after the last accepted edge.
    RejectedNoise,
    /// Arrived later than the stale ceiling; the edge timer was re-armed.
    RejectedStale,
}

/// Handle given to the edge producer.
///
/// Exactly one exists per meter and it is deliberately not `Clone`, so the
/// shared state always has a single writer. `on_edge` never blocks and never
/// allocates.
#[derive(Debug)]
pub struct EdgeCapture<T> {
    timebase: TimeBase<T>,
    shared: Arc<SharedMeasurement>,
    noise_floor: u64,
    stale_ceiling: u64,
    vote_band: i32,
    state: Published,
    armed: bool,
}

impl<T: TickSource> EdgeCapture<T> {
    pub(crate) fn new(
        timebase: TimeBase<T>,
        shared: Arc<SharedMeasurement>,
        noise_floor: u64,
        stale_ceiling: u64,
        vote_band: i32,
        initial_state: QuadratureState,
        now: Ticks,
    ) -> Self {
        Self {
            timebase,
            shared,
            noise_floor,
            stale_ceiling,
            vote_band,
            state: Published {
                edge_count: 0,
                votes: 0,
                last_state: initial_state,
                last_edge: now,
                interrupt_count: 0,
                rejected_count: 0,
            },
            armed: false,
        }
    }

    /// Handle one electrical edge. The counter is sampled before the channel
    /// levels are read.
    #[inline]
    pub fn on_edge(&mut self, sample_levels: impl FnOnce() -> (bool, bool)) -> EdgeOutcome {
        match self.try_on_edge(|| Ok::<_, Infallible>(sample_levels())) {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        }
    }

    /// Like `on_edge`, for level readers that can fail. On error nothing is
    /// recorded.
    #[inline]
    pub fn try_on_edge<E>(
        &mut self,
        sample_levels: impl FnOnce() -> Result<(bool, bool), E>,
    ) -> Result<EdgeOutcome, E> {
        let now = self.timebase.now();
        let (a, b) = sample_levels()?;
        Ok(self.record(now, QuadratureState::from_levels(a, b)))
    }

    /// Record an edge observed at `now` with channel state `new`.
    pub fn record(&mut self, now: Ticks, new: QuadratureState) -> EdgeOutcome {
        let st = &mut self.state;
        st.interrupt_count = st.interrupt_count.wrapping_add(1);

        let outcome = if new == st.last_state {
            EdgeOutcome::Duplicate
        } else if !self.armed {
            // first edge after start: nothing to measure against
            Self::accept(st, self.vote_band, now, new)
        } else {
            let period = u64::from(self.timebase.elapsed(st.last_edge, now));
            if period < self.noise_floor {
                st.last_state = new;
                st.rejected_count = st.rejected_count.wrapping_add(1);
                EdgeOutcome::RejectedNoise
            } else if period > self.stale_ceiling {
                st.last_state = new;
                st.last_edge = now;
                st.rejected_count = st.rejected_count.wrapping_add(1);
                EdgeOutcome::RejectedStale
            } else {
                Self::accept(st, self.vote_band, now, new)
            }
        };
        if matches!(outcome, EdgeOutcome::Accepted(_)) {
            self.armed = true;
        }
        self.shared.publish(&self.state);
        outcome
    }

    #[inline]
    fn accept(st: &mut Published, band: i32, now: Ticks, new: QuadratureState) -> EdgeOutcome {
        let vote = decode(st.last_state, new);
        st.edge_count = st.edge_count.wrapping_add(1);
        st.votes = st.votes.saturating_add(i32::from(vote)).clamp(-band, band);
        st.last_state = new;
        st.last_edge = now;
        EdgeOutcome::Accepted(vote)
    }

    /// Adopt the current channel levels as the reference state without
    /// counting an edge. Useful right before edges start arriving.
    pub fn prime(&mut self, a: bool, b: bool) {
        self.state.last_state = QuadratureState::from_levels(a, b);
        self.shared.publish(&self.state);
    }

    pub fn edge_count(&self) -> u32 {
        self.state.edge_count
    }

    pub fn votes(&self) -> i32 {
        self.state.votes
    }

    pub fn interrupt_count(&self) -> u32 {
        self.state.interrupt_count
    }

    pub fn rejected_count(&self) -> u32 {
        self.state.rejected_count
    }

    pub fn last_state(&self) -> QuadratureState {
        self.state.last_state
    }
}
