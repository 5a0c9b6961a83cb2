use std::time::Duration;

use quadspeed_config::SpeedUnit;
use quadspeed_core::{MeterCfg, SensorCfg, Speedometer};
use quadspeed_traits::ManualTicks;

const FULL: &str = r#"
[sensor]
edges_per_rotation = 80

[wheel]
radius_m = 0.3

[timebase]
frequency_hz = 48000000
width_bits = 24

[capture]
noise_floor_us = 20
stale_ceiling_ms = 250
vote_band = 40

[estimator]
update_hz = 50
min_window_ms = 10
stopped_timeout_ms = 300
max_rpm = 6000.0
max_speed = 90.0
speed_unit = "mph"

[direction]
threshold = 8
"#;

#[test]
fn full_config_maps_every_section() {
    let cfg: quadspeed_config::Config = toml::from_str(FULL).unwrap();
    let meter: MeterCfg = (&cfg).into();

    assert_eq!(meter.sensor.edges_per_rotation, 80);
    assert!((meter.sensor.circumference_m - 2.0 * std::f64::consts::PI * 0.3).abs() < 1e-12);
    assert_eq!(meter.timebase.frequency_hz, 48_000_000);
    assert_eq!(meter.timebase.width_bits, 24);
    assert_eq!(meter.capture.noise_floor, Duration::from_micros(20));
    assert_eq!(meter.capture.stale_ceiling, Duration::from_millis(250));
    assert_eq!(meter.capture.vote_band, 40);
    assert_eq!(meter.estimator.update_hz, 50);
    assert_eq!(meter.estimator.min_window, Duration::from_millis(10));
    assert_eq!(meter.estimator.stopped_timeout, Duration::from_millis(300));
    assert_eq!(meter.estimator.max_rpm, 6000.0);
    assert_eq!(meter.estimator.max_speed, 90.0);
    assert_eq!(meter.estimator.speed_unit, SpeedUnit::Mph);
    assert_eq!(meter.direction.threshold, 8);
}

#[test]
fn minimal_config_takes_core_defaults() {
    let cfg = quadspeed_config::load_toml(
        "[sensor]\nedges_per_rotation = 4\n[wheel]\ncircumference_m = 0.2\n",
    )
    .unwrap();
    let meter: MeterCfg = (&cfg).into();
    assert_eq!(
        meter,
        MeterCfg::new(SensorCfg {
            edges_per_rotation: 4,
            circumference_m: 0.2
        })
    );
}

#[test]
fn mapped_config_builds_a_meter() {
    let cfg: quadspeed_config::Config = toml::from_str(FULL).unwrap();
    cfg.validate().unwrap();
    let meter_cfg: MeterCfg = (&cfg).into();
    let ticks = ManualTicks::new(0, meter_cfg.timebase.frequency_hz, meter_cfg.timebase.width_bits);
    let (_capture, meter) = Speedometer::builder()
        .ticks(ticks)
        .config(&meter_cfg)
        .build()
        .unwrap();
    assert_eq!(meter.update_hz(), 50);
    assert_eq!(meter.timebase().mask(), 0x00FF_FFFF);
}

#[test]
fn missing_wheel_size_is_caught_by_the_builder() {
    let cfg = quadspeed_config::load_toml("[sensor]\nedges_per_rotation = 4\n[wheel]\n").unwrap();
    let sensor: SensorCfg = (&cfg).into();
    assert_eq!(sensor.circumference_m, 0.0);
    assert!(
        Speedometer::builder()
            .ticks(ManualTicks::new(0, 1_000_000, 32))
            .sensor(sensor)
            .build()
            .is_err()
    );
}
