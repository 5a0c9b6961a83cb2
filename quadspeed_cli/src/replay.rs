//! Deterministic replay of a recorded edge trace.

use std::path::Path;
use std::time::Instant;

use quadspeed_config::Config;
use quadspeed_core::MeterCfg;

use crate::output::{ConsoleDisplay, print_summary};

pub fn replay(cfg: &Config, trace: &Path, every: usize, json: bool) -> eyre::Result<()> {
    let rows = quadspeed_config::load_trace_csv(trace)?;
    tracing::info!(path = %trace.display(), edges = rows.len(), "trace loaded");

    let meter_cfg: MeterCfg = cfg.into();
    // the replayer already thins frames to every Nth cycle
    let mut display = ConsoleDisplay::new(json, 1);
    let started = Instant::now();
    let summary = quadspeed_core::replay::replay(&rows, &meter_cfg, every, &mut display)?;
    print_summary("replay", &summary, started.elapsed(), json);
    Ok(())
}
