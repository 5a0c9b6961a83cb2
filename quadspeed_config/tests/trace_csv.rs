use std::fs::File;
use std::io::Write;

use quadspeed_config::{TraceRow, load_trace_csv};
use rstest::rstest;
use tempfile::tempdir;

fn write_csv(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");
    let mut f = File::create(&path).unwrap();
    for l in lines {
        writeln!(f, "{l}").unwrap();
    }
    (dir, path)
}

#[rstest]
fn loads_rows_in_order() {
    let (_dir, path) = write_csv(&["ticks,a,b", "4294967295,1,1", "4294962295, 0, 1", "10,0,0"]);
    let rows = load_trace_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            TraceRow { ticks: u32::MAX, a: 1, b: 1 },
            TraceRow { ticks: u32::MAX - 5000, a: 0, b: 1 },
            TraceRow { ticks: 10, a: 0, b: 0 },
        ]
    );
    assert_eq!(rows[1].levels(), (false, true));
}

#[rstest]
fn csv_with_wrong_headers_errors() {
    let (_dir, path) = write_csv(&["time,a,b", "1,0,0"]);
    let err = load_trace_csv(&path).expect_err("should error on bad headers");
    assert!(format!("{err}").contains("headers 'ticks,a,b'"));
}

#[rstest]
#[case("abc,0,1")]
#[case("-5,0,1")]
#[case("100,x,1")]
fn csv_with_non_numeric_errors(#[case] line: &str) {
    let (_dir, path) = write_csv(&["ticks,a,b", line]);
    let err = load_trace_csv(&path).expect_err("should error on bad row");
    assert!(format!("{err}").contains("invalid CSV row 2"));
}

#[rstest]
fn csv_with_bad_level_errors() {
    let (_dir, path) = write_csv(&["ticks,a,b", "100,0,1", "90,2,1"]);
    let err = load_trace_csv(&path).expect_err("should reject level 2");
    let msg = format!("{err}");
    assert!(msg.contains("invalid CSV row 3"), "{msg}");
    assert!(msg.contains("must be 0 or 1"), "{msg}");
}

#[rstest]
fn empty_trace_errors() {
    let (_dir, path) = write_csv(&["ticks,a,b"]);
    let err = load_trace_csv(&path).expect_err("should reject empty trace");
    assert!(format!("{err}").contains("no edges"));
}

#[rstest]
fn missing_file_errors() {
    let dir = tempdir().unwrap();
    let err = load_trace_csv(&dir.path().join("nope.csv")).expect_err("missing file");
    assert!(format!("{err}").contains("open trace CSV"));
}
