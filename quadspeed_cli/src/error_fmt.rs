//! Human-readable error descriptions and structured JSON error formatting.

use quadspeed_core::error::{BuildError, SpeedoError};

/// Stable name for the JSON `reason` field.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(e) = err.downcast_ref::<SpeedoError>() {
        return match e {
            SpeedoError::Hardware(_) => "Hardware",
            SpeedoError::HardwareFault(_) => "HardwareFault",
            SpeedoError::Config(_) => "Config",
            SpeedoError::Display(_) => "Display",
            SpeedoError::CaptureStopped(_) => "CaptureStopped",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    "Error"
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No sensor geometry was provided to the meter.\nLikely causes: The builder was not given edges_per_rotation and a wheel size.\nHow to fix: Set [sensor] and [wheel] in the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML, or limits longer than the counter wrap period.\nHow to fix: Edit the config file, then rerun `quadspeed self-check`."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<SpeedoError>() {
        return match se {
            SpeedoError::Hardware(msg) | SpeedoError::HardwareFault(msg) => format!(
                "What happened: The sensor stopped responding ({msg}).\nLikely causes: Loose wiring on channel A/B, missing power, or insufficient GPIO permissions.\nHow to fix: Check [pins] and the encoder supply, then rerun `quadspeed self-check`."
            ),
            SpeedoError::CaptureStopped(msg) => format!(
                "What happened: Edge capture ended unexpectedly ({msg}).\nLikely causes: A panic in the capture thread.\nHow to fix: Re-run with --log-level=debug and report the log."
            ),
            SpeedoError::Display(msg) => format!(
                "What happened: Output failed ({msg}).\nLikely causes: stdout was closed (e.g. a pipe reader exited).\nHow to fix: Keep the reading side open or redirect output to a file."
            ),
            SpeedoError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    // String-based heuristics for errors coming from config or trace loading
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 'ticks,a,b'.".to_string();
    }

    if lower.contains("trace csv") || lower.contains("invalid csv row") {
        return format!(
            "What happened: The edge trace could not be loaded.\nLikely causes: Missing file, non-numeric ticks, or channel levels other than 0/1.\nHow to fix: Check the CSV. Original: {msg}"
        );
    }

    if lower.contains("read config") || lower.contains("parse config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or TOML syntax error.\nHow to fix: Pass a valid file with --config. Original: {msg}"
        );
    }

    if lower.contains("must be") || lower.contains("is required") || lower.contains("must differ")
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range or missing values in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    // Generic fallback
    format!(
        "Something went wrong.\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 sensor, 4 capture thread, 5 output, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<SpeedoError>() {
        Some(SpeedoError::Hardware(_) | SpeedoError::HardwareFault(_)) => 3,
        Some(SpeedoError::CaptureStopped(_)) => 4,
        Some(SpeedoError::Display(_)) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
