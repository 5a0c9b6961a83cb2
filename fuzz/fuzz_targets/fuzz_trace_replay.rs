#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use quadspeed_config::TraceRow;
use quadspeed_core::mocks::RecordingDisplay;
use quadspeed_core::{MeterCfg, SensorCfg};

#[derive(Debug, Arbitrary)]
struct Edge {
    /// Ticks since the previous row, kept well inside one wrap period.
    gap: u16,
    a: bool,
    b: bool,
}

fuzz_target!(|edges: Vec<Edge>| {
    if edges.is_empty() || edges.len() > 4_096 {
        return;
    }
    let mut t = u32::MAX;
    let rows: Vec<TraceRow> = edges
        .iter()
        .map(|e| {
            t = t.wrapping_sub(u32::from(e.gap));
            TraceRow {
                ticks: t,
                a: u8::from(e.a),
                b: u8::from(e.b),
            }
        })
        .collect();

    let cfg = MeterCfg::new(SensorCfg {
        edges_per_rotation: 4,
        circumference_m: 0.2,
    });
    let mut display = RecordingDisplay::default();
    let summary = quadspeed_core::replay::replay(&rows, &cfg, 1, &mut display)
        .expect("valid config and non-empty trace");

    assert!(summary.edges as usize <= rows.len());
    for f in &display.frames {
        assert!(f.rpm.is_finite() && f.rpm >= 0.0 && f.rpm <= cfg.estimator.max_rpm);
        assert!(f.speed.is_finite() && f.speed >= 0.0 && f.speed <= cfg.estimator.max_speed);
        assert!(f.distance_m.is_finite() && f.distance_m >= 0.0);
    }
});
