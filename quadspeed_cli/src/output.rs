//! Console rendering of frames and run summaries.

use std::io::Write;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use quadspeed_core::RunSummary;
use quadspeed_traits::{Display, DisplayFrame};
use serde_json::json;

/// Writes every `every`-th frame to stdout as a text line or a JSON object.
pub struct ConsoleDisplay {
    json: bool,
    every: u64,
    seen: u64,
}

impl ConsoleDisplay {
    pub fn new(json: bool, every: usize) -> Self {
        Self {
            json,
            every: every.max(1) as u64,
            seen: 0,
        }
    }
}

pub fn frame_line(frame: &DisplayFrame) -> String {
    format!(
        "{:>8.1} rpm  {:>7.2} {:<4}  {:>10.3} m  {}",
        frame.rpm, frame.speed, frame.speed_unit, frame.distance_m, frame.direction
    )
}

pub fn frame_json(frame: &DisplayFrame) -> serde_json::Value {
    json!({
        "rpm": frame.rpm,
        "speed": frame.speed,
        "unit": frame.speed_unit,
        "distance_m": frame.distance_m,
        "direction": frame.direction.as_str(),
    })
}

impl Display for ConsoleDisplay {
    fn show(&mut self, frame: &DisplayFrame) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.seen += 1;
        if self.seen % self.every != 0 {
            return Ok(());
        }
        let mut out = std::io::stdout().lock();
        if self.json {
            writeln!(out, "{}", frame_json(frame))?;
        } else {
            writeln!(out, "{}", frame_line(frame))?;
        }
        Ok(())
    }
}

fn unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Final line of a run or replay.
pub fn print_summary(command: &str, summary: &RunSummary, elapsed: Duration, json: bool) {
    let f = &summary.final_frame;
    if json {
        let v = json!({
            "timestamp": unix_ms(),
            "command": command,
            "duration_ms": elapsed.as_millis() as u64,
            "cycles": summary.cycles,
            "updates": summary.updates,
            "stops": summary.stops,
            "peak_rpm": summary.peak_rpm,
            "edges": summary.edges,
            "rejected": summary.rejected,
            "final": frame_json(f),
        });
        println!("{v}");
    } else {
        println!(
            "{command} complete: {} cycles, peak {:.1} rpm, {:.3} m travelled, {} edges ({} rejected)",
            summary.cycles, summary.peak_rpm, f.distance_m, summary.edges, summary.rejected
        );
    }
}

/// Cycle statistics to stderr.
pub fn print_stats(summary: &RunSummary, update_hz: u32) {
    eprintln!("\n--- quadspeed stats ---");
    eprintln!("Update rate (Hz): {update_hz}");
    eprintln!(
        "Cycles: {} (updated {}, deferred {}, stopped {})",
        summary.cycles, summary.updates, summary.deferrals, summary.stops
    );
    eprintln!(
        "Interrupts: {}  accepted edges: {}  rejected: {}",
        summary.interrupts, summary.edges, summary.rejected
    );
    eprintln!("Peak rpm: {:.1}", summary.peak_rpm);
    eprintln!("-----------------------\n");
}
