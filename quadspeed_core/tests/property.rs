//! Invariants over random edge timings.

mod common;

use std::time::Duration;

use common::{Rig, mps_cfg};
use proptest::prelude::*;
use quadspeed_core::UpdateOutcome;

#[derive(Debug, Clone)]
enum Step {
    Wait(u32),
    Forward,
    Reverse,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u32..20_000).prop_map(Step::Wait),
        Just(Step::Forward),
        Just(Step::Reverse),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Every accepted edge lands in exactly one window, and distance is
    /// the sum of the windows' distances.
    #[test]
    fn edges_are_counted_once(start in any::<u32>(), steps in prop::collection::vec(step(), 1..300)) {
        let mut rig = Rig::starting_at(start, &mps_cfg());
        let mut counted: u64 = 0;
        let mut travelled = 0.0f64;

        for s in &steps {
            match s {
                Step::Wait(us) => rig.wait(Duration::from_micros(u64::from(*us))),
                Step::Forward => { rig.forward(); }
                Step::Reverse => { rig.reverse(); }
            }
            if let UpdateOutcome::Updated(m) = rig.meter.update() {
                counted += u64::from(m.edges);
                travelled += m.distance_m;
            }
        }
        // one last window long enough to drain anything pending
        rig.wait(Duration::from_millis(10));
        if let UpdateOutcome::Updated(m) = rig.meter.update() {
            counted += u64::from(m.edges);
            travelled += m.distance_m;
        }

        prop_assert_eq!(counted, u64::from(rig.capture.edge_count()));
        prop_assert!((rig.meter.distance() - travelled).abs() < 1e-9);
        let expected = counted as f64 / 4.0 * 0.2;
        prop_assert!((travelled - expected).abs() < 1e-9);
    }

    /// Published values stay finite and within the configured limits.
    #[test]
    fn outputs_stay_within_limits(steps in prop::collection::vec(step(), 1..300)) {
        let mut rig = Rig::mps();
        for s in &steps {
            match s {
                Step::Wait(us) => rig.wait(Duration::from_micros(u64::from(*us))),
                Step::Forward => { rig.forward(); }
                Step::Reverse => { rig.reverse(); }
            }
            rig.meter.update();
            let f = rig.meter.frame();
            prop_assert!(f.rpm.is_finite() && f.rpm >= 0.0 && f.rpm <= 10_000.0);
            prop_assert!(f.speed.is_finite() && f.speed >= 0.0 && f.speed <= 120.0);
        }
        prop_assert!(rig.capture.votes().abs() <= 100);
    }
}
