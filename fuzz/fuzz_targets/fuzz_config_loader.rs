#![no_main]
use libfuzzer_sys::fuzz_target;
use quadspeed_core::{MeterCfg, Speedometer};
use quadspeed_traits::ManualTicks;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not. A config that
    // validates must also either build a meter or fail with an error.
    let Ok(cfg) = toml::from_str::<quadspeed_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let meter: MeterCfg = (&cfg).into();
    let ticks = ManualTicks::new(0, meter.timebase.frequency_hz, meter.timebase.width_bits);
    let _ = Speedometer::builder().ticks(ticks).config(&meter).build();
});
