//! Measurement state shared between the edge producer and the estimator.
//!
//! Access follows a sequence-lock discipline:
//!
//! - The single writer (`EdgeCapture`) bumps `seq` to odd, stores every field,
//!   then bumps `seq` back to even. It never waits.
//! - Readers load `seq`, read the fields plus the current counter value, and
//!   retry if `seq` was odd or changed underneath them.
//!
//! A snapshot therefore never mixes fields from two different edges, and the
//! paired timestamp is taken while those fields were current.
use std::sync::atomic::{AtomicI32, AtomicU8, AtomicU32, Ordering, fence};

use quadspeed_traits::TickSource;

use crate::quadrature::QuadratureState;
use crate::timebase::{TimeBase, Ticks};

/// Values published by the writer after each edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Published {
    pub edge_count: u32,
    pub votes: i32,
    pub last_state: QuadratureState,
    pub last_edge: Ticks,
    pub interrupt_count: u32,
    pub rejected_count: u32,
}

/// One consistent read of the shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub edge_count: u32,
    pub votes: i32,
    pub last_state: QuadratureState,
    pub last_edge: Ticks,
    pub interrupt_count: u32,
    pub rejected_count: u32,
    /// Counter value sampled inside the read section.
    pub now: Ticks,
}

#[derive(Debug)]
pub struct SharedMeasurement {
    seq: AtomicU32,
    edge_count: AtomicU32,
    votes: AtomicI32,
    last_state: AtomicU8,
    last_edge: AtomicU32,
    interrupt_count: AtomicU32,
    rejected_count: AtomicU32,
}

impl SharedMeasurement {
    pub(crate) fn new(initial_state: QuadratureState, now: Ticks) -> Self {
        Self {
            seq: AtomicU32::new(0),
            edge_count: AtomicU32::new(0),
            votes: AtomicI32::new(0),
            last_state: AtomicU8::new(initial_state.bits()),
            last_edge: AtomicU32::new(now.raw()),
            interrupt_count: AtomicU32::new(0),
            rejected_count: AtomicU32::new(0),
        }
    }

    /// Publish a new set of values. Only `EdgeCapture` calls this, and only
    /// one `EdgeCapture` exists per `SharedMeasurement`.
    #[inline]
    pub(crate) fn publish(&self, p: &Published) {
        let s = self.seq.load(Ordering::Relaxed);
        self.seq.store(s.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        self.edge_count.store(p.edge_count, Ordering::Relaxed);
        self.votes.store(p.votes, Ordering::Relaxed);
        self.last_state.store(p.last_state.bits(), Ordering::Relaxed);
        self.last_edge.store(p.last_edge.raw(), Ordering::Relaxed);
        self.interrupt_count
            .store(p.interrupt_count, Ordering::Relaxed);
        self.rejected_count.store(p.rejected_count, Ordering::Relaxed);

        self.seq.store(s.wrapping_add(2), Ordering::Release);
    }

    /// Read all fields plus the current time as one consistent snapshot.
    pub fn snapshot<T: TickSource>(&self, timebase: &TimeBase<T>) -> Snapshot {
        loop {
            let s1 = self.seq.load(Ordering::Acquire);
            if s1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let edge_count = self.edge_count.load(Ordering::Relaxed);
            let votes = self.votes.load(Ordering::Relaxed);
            let last_state = QuadratureState::from_bits(self.last_state.load(Ordering::Relaxed));
            let last_edge = Ticks::from_raw(self.last_edge.load(Ordering::Relaxed));
            let interrupt_count = self.interrupt_count.load(Ordering::Relaxed);
            let rejected_count = self.rejected_count.load(Ordering::Relaxed);
            let now = timebase.now();
            fence(Ordering::Acquire);
            let s2 = self.seq.load(Ordering::Relaxed);
            if s1 == s2 {
                return Snapshot {
                    edge_count,
                    votes,
                    last_state,
                    last_edge,
                    interrupt_count,
                    rejected_count,
                    now,
                };
            }
            std::hint::spin_loop();
        }
    }

    /// Single-field reads for diagnostics; not mutually consistent.
    pub fn edge_count(&self) -> u32 {
        self.edge_count.load(Ordering::Relaxed)
    }

    pub fn interrupt_count(&self) -> u32 {
        self.interrupt_count.load(Ordering::Relaxed)
    }

    pub fn rejected_count(&self) -> u32 {
        self.rejected_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadspeed_traits::ManualTicks;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn snapshot_sees_published_values() {
        let ticks = ManualTicks::new(1_000, 1_000_000, 32);
        let tb = TimeBase::new(ticks.clone());
        let shared = SharedMeasurement::new(QuadratureState::from_bits(0b11), tb.now());
        shared.publish(&Published {
            edge_count: 3,
            votes: -2,
            last_state: QuadratureState::from_bits(0b01),
            last_edge: Ticks::from_raw(900),
            interrupt_count: 5,
            rejected_count: 1,
        });
        ticks.set(850);
        let s = shared.snapshot(&tb);
        assert_eq!(s.edge_count, 3);
        assert_eq!(s.votes, -2);
        assert_eq!(s.last_state.bits(), 0b01);
        assert_eq!(s.last_edge.raw(), 900);
        assert_eq!(s.interrupt_count, 5);
        assert_eq!(s.rejected_count, 1);
        assert_eq!(s.now.raw(), 850);
    }

    // The writer keeps edge_count == interrupt_count == -votes; any torn read
    // would break the relation.
    #[test]
    fn concurrent_reads_are_never_torn() {
        let tb = TimeBase::new(ManualTicks::new(0, 1_000_000, 32));
        let shared = Arc::new(SharedMeasurement::new(
            QuadratureState::from_bits(0),
            tb.now(),
        ));
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let shared = shared.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut n: u32 = 0;
                while !done.load(Ordering::Relaxed) {
                    n = n.wrapping_add(1);
                    shared.publish(&Published {
                        edge_count: n,
                        votes: -(n as i32),
                        last_state: QuadratureState::from_bits((n & 3) as u8),
                        last_edge: Ticks::from_raw(n),
                        interrupt_count: n,
                        rejected_count: n,
                    });
                }
            })
        };

        for _ in 0..200_000 {
            let s = shared.snapshot(&tb);
            assert_eq!(s.edge_count, s.interrupt_count);
            assert_eq!(s.edge_count, s.rejected_count);
            assert_eq!(s.edge_count, s.last_edge.raw());
            assert_eq!(s.votes, -(s.edge_count as i32));
            assert_eq!(u32::from(s.last_state.bits()), s.edge_count & 3);
        }
        done.store(true, Ordering::Relaxed);
        writer.join().unwrap();
    }
}
