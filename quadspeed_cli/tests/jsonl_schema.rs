use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[sensor]
edges_per_rotation = 16

[wheel]
radius_m = 0.1

[runner]
sim_rpm = 300.0
edge_timeout_ms = 20
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not JSON ({e}): {l}")))
        .collect()
}

/// Every stdout line of a JSON run is an object; frames first, summary last.
#[rstest]
#[case(false, "forward")]
#[case(true, "reverse")]
fn jsonl_run_schema(#[case] reverse: bool, #[case] direction: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("quadspeed").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--duration-ms", "400", "--every", "5"])
        .env("QUADSPEED_SIM_RPM", "900");
    if reverse {
        cmd.arg("--reverse");
    }

    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = json_lines(&out);
    assert!(lines.len() >= 2, "expected frames and a summary");

    let (summary, frames) = lines.split_last().unwrap();
    for f in frames {
        for key in ["rpm", "speed", "distance_m"] {
            assert!(f.get(key).and_then(|x| x.as_f64()).is_some(), "{key} in {f}");
        }
        assert_eq!(f["unit"], "km/h");
        assert!(f["direction"].is_string());
    }

    assert_eq!(summary["command"], "run");
    assert!(summary.get("timestamp").and_then(|x| x.as_i64()).is_some());
    assert!(summary.get("duration_ms").and_then(|x| x.as_u64()).is_some());
    assert!(summary["cycles"].as_u64().unwrap() > 0);
    assert!(summary["edges"].as_u64().unwrap() > 0);
    assert!(summary["peak_rpm"].as_f64().unwrap() > 0.0);
    assert_eq!(summary["final"]["direction"], direction);
}

/// Errors in JSON mode are a single object on stdout.
#[rstest]
fn jsonl_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[sensor]\nedges_per_rotation = 0\n[wheel]\nradius_m = 0.1\n").unwrap();

    let mut cmd = Command::cargo_bin("quadspeed").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("self-check");

    let out = cmd.assert().code(1).get_output().stdout.clone();
    let lines = json_lines(&out);
    assert_eq!(lines.len(), 1);
    let v = &lines[0];
    assert_eq!(v["reason"], "Error");
    assert_eq!(v["exit_code"], 1);
    assert!(v["message"].as_str().unwrap().contains("edges_per_rotation"));
}

#[rstest]
fn jsonl_self_check() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("quadspeed").unwrap();
    cmd.args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .arg("self-check");
    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = json_lines(&out);
    assert_eq!(lines[0]["status"], "ok");
    assert_eq!(lines[0]["sensor"], "simulated");
    assert_eq!(lines[0]["edges_per_rotation"], 16);
}
