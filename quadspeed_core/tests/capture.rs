//! Edge qualification: noise floor, stale ceiling, duplicates and votes.

use std::time::Duration;

use quadspeed_core::{CaptureCfg, DirectionCfg, EdgeCapture, EdgeOutcome, SensorCfg, Speedometer};
use quadspeed_traits::ManualTicks;
use rstest::rstest;

// Gray-code order for forward rotation, starting after the idle state 11.
const FORWARD: [(bool, bool); 4] = [(false, true), (false, false), (true, false), (true, true)];

fn rig(capture: CaptureCfg, threshold: i32) -> (ManualTicks, EdgeCapture<ManualTicks>) {
    let ticks = ManualTicks::new(u32::MAX, 1_000_000, 32);
    let (cap, _meter) = Speedometer::builder()
        .ticks(ticks.clone())
        .sensor(SensorCfg {
            edges_per_rotation: 4,
            circumference_m: 0.2,
        })
        .capture(capture)
        .direction(DirectionCfg { threshold })
        .build()
        .expect("valid meter");
    (ticks, cap)
}

fn default_rig() -> (ManualTicks, EdgeCapture<ManualTicks>) {
    rig(CaptureCfg::default(), 5)
}

#[test]
fn first_edge_is_accepted_without_a_period() {
    let (_ticks, mut cap) = default_rig();
    assert_eq!(cap.on_edge(|| FORWARD[0]), EdgeOutcome::Accepted(1));
    assert_eq!(cap.edge_count(), 1);
    assert_eq!(cap.votes(), 1);
}

#[test]
fn unchanged_levels_are_duplicates() {
    let (ticks, mut cap) = default_rig();
    ticks.advance(Duration::from_millis(1));
    assert_eq!(cap.on_edge(|| (true, true)), EdgeOutcome::Duplicate);
    assert_eq!(cap.edge_count(), 0);
    assert_eq!(cap.interrupt_count(), 1);
    assert_eq!(cap.rejected_count(), 0);
}

#[test]
fn bounce_inside_noise_floor_is_rejected_but_tracked() {
    let (ticks, mut cap) = default_rig();
    assert!(matches!(cap.on_edge(|| FORWARD[0]), EdgeOutcome::Accepted(_)));

    ticks.advance(Duration::from_micros(10));
    assert_eq!(cap.on_edge(|| FORWARD[1]), EdgeOutcome::RejectedNoise);
    assert_eq!(cap.edge_count(), 1);
    assert_eq!(cap.rejected_count(), 1);

    // the rejected edge still moved the reference state forward
    ticks.advance(Duration::from_millis(1));
    assert_eq!(cap.on_edge(|| FORWARD[2]), EdgeOutcome::Accepted(1));
    assert_eq!(cap.edge_count(), 2);
}

#[test]
fn noise_floor_is_measured_from_last_accepted_edge() {
    let (ticks, mut cap) = default_rig();
    cap.on_edge(|| FORWARD[0]);
    ticks.advance(Duration::from_micros(30));
    assert_eq!(cap.on_edge(|| FORWARD[1]), EdgeOutcome::RejectedNoise);
    // 60us after the accepted edge, even though only 30us after the bounce
    ticks.advance(Duration::from_micros(30));
    assert_eq!(cap.on_edge(|| FORWARD[2]), EdgeOutcome::Accepted(1));
}

#[test]
fn stale_edge_rearms_the_timer() {
    let (ticks, mut cap) = default_rig();
    cap.on_edge(|| FORWARD[0]);

    ticks.advance(Duration::from_secs(3));
    assert_eq!(cap.on_edge(|| FORWARD[1]), EdgeOutcome::RejectedStale);
    assert_eq!(cap.edge_count(), 1);
    assert_eq!(cap.rejected_count(), 1);

    ticks.advance(Duration::from_millis(2));
    assert_eq!(cap.on_edge(|| FORWARD[2]), EdgeOutcome::Accepted(1));
    assert_eq!(cap.edge_count(), 2);
}

#[test]
fn reverse_sequence_votes_negative() {
    let (ticks, mut cap) = default_rig();
    for &levels in FORWARD.iter().rev().skip(1) {
        ticks.advance(Duration::from_millis(1));
        assert_eq!(cap.on_edge(|| levels), EdgeOutcome::Accepted(-1));
    }
    assert_eq!(cap.votes(), -3);
}

#[test]
fn skipped_state_counts_without_voting() {
    let (ticks, mut cap) = default_rig();
    ticks.advance(Duration::from_millis(1));
    // 11 -> 00 flips both channels at once
    assert_eq!(cap.on_edge(|| (false, false)), EdgeOutcome::Accepted(0));
    assert_eq!(cap.edge_count(), 1);
    assert_eq!(cap.votes(), 0);
}

#[rstest]
#[case(10, 50, 10)]
#[case(10, 7, 7)]
#[case(1, 4, 1)]
fn votes_are_clamped_to_band(#[case] band: i32, #[case] edges: usize, #[case] expected: i32) {
    let (ticks, mut cap) = rig(
        CaptureCfg {
            vote_band: band,
            ..CaptureCfg::default()
        },
        0,
    );
    for i in 0..edges {
        ticks.advance(Duration::from_millis(1));
        cap.on_edge(|| FORWARD[i % 4]);
    }
    assert_eq!(cap.votes(), expected);
    assert_eq!(cap.edge_count() as usize, edges);
}

#[test]
fn primed_levels_become_reference_state() {
    let (ticks, mut cap) = default_rig();
    cap.prime(false, false);
    ticks.advance(Duration::from_millis(1));
    assert_eq!(cap.on_edge(|| (true, false)), EdgeOutcome::Accepted(1));
    assert_eq!(cap.edge_count(), 1);
}

#[test]
fn failed_level_read_records_nothing() {
    let (_ticks, mut cap) = default_rig();
    let res: Result<EdgeOutcome, &str> = cap.try_on_edge(|| Err("gpio read failed"));
    assert_eq!(res, Err("gpio read failed"));
    assert_eq!(cap.interrupt_count(), 0);
}

#[test]
fn counting_survives_counter_wrap() {
    let ticks = ManualTicks::new(1_500, 1_000_000, 32);
    let (mut cap, _meter) = Speedometer::builder()
        .ticks(ticks.clone())
        .sensor(SensorCfg {
            edges_per_rotation: 4,
            circumference_m: 0.2,
        })
        .build()
        .expect("valid meter");
    for (i, levels) in FORWARD.iter().enumerate() {
        ticks.advance(Duration::from_millis(1));
        assert_eq!(cap.on_edge(|| *levels), EdgeOutcome::Accepted(1), "edge {i}");
    }
    assert_eq!(cap.rejected_count(), 0);
}
