//! Integration tests for catena-cli.
//!
//! Tests run the built `catena` binary: listings, chain checks and
//! end-to-end file processing through a temporary directory.

use catena_io::{WavSpec, read_wav, write_wav};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the `catena` binary built by cargo.
fn catena_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_catena"))
}

fn run(args: &[&str]) -> Output {
    catena_bin()
        .args(args)
        .output()
        .expect("failed to run catena")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_input(path: &Path, channels: u16, value: f32, frames: usize) {
    let spec = WavSpec {
        channels,
        sample_rate: 48000,
        bits_per_sample: 32,
    };
    write_wav(path, &vec![value; frames * channels as usize], spec).unwrap();
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[test]
fn cli_help_works() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Catena chain engine CLI"));
    for command in ["process", "operators", "controllers", "check", "info"] {
        assert!(text.contains(command), "help should list '{command}'");
    }
}

#[test]
fn cli_operators_lists_keywords() {
    let output = run(&["operators"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for keyword in ["-ea ", "-eac", "-efl", "-etd", "-ete", "-gc ", "-ei "] {
        assert!(text.contains(keyword), "listing should contain '{keyword}'");
    }
}

#[test]
fn cli_operators_json_has_every_operator() {
    let output = run(&["operators", "--json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 40);
    let etd = list.iter().find(|op| op["keyword"] == "etd").unwrap();
    assert_eq!(etd["parameters"].as_array().unwrap().len(), 4);
}

#[test]
fn cli_operators_category_filter() {
    let output = run(&["operators", "--category", "filter", "--json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 11);
    assert!(list.iter().all(|op| op["category"] == "Filter"));

    let output = run(&["operators", "--category", "nope"]);
    assert!(!output.status.success());
}

#[test]
fn cli_operator_detail_and_unknown() {
    let output = run(&["operators", "etd"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Parameters"));

    let output = run(&["operators", "zzz"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown operator"), "got: {stderr}");
}

#[test]
fn cli_controllers_json() {
    let output = run(&["controllers", "--json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 7);
    let kos = list.iter().find(|c| c["keyword"] == "kos").unwrap();
    // param-id, range-low, range-high, freq, phase
    assert_eq!(kos["parameters"].as_array().unwrap().len(), 5);
}

// ---------------------------------------------------------------------------
// Chain checks
// ---------------------------------------------------------------------------

#[test]
fn cli_check_prints_normalised_chain() {
    let output = run(&["check", "--", "-ea:100  -kos:1,0,100,0.5,0 -kx -kl:3,100,200,2"]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let text = stdout(&output);
    assert!(text.starts_with("-ea:100 -kos:1,0,100,0.5,0 -kx -kl:3,100,200,2\n"));
    assert!(text.contains("-> operator 1"));
    assert!(text.contains("-> controller c1"));
}

#[test]
fn cli_check_points_at_error() {
    let output = run(&["check", "--", "-ea:100 -zz:1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("          ^"), "got: {stderr}");
    assert!(stderr.contains("unknown keyword '-zz'"), "got: {stderr}");
}

#[test]
fn cli_presets_library() {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("presets.txt");
    std::fs::write(&library, "# house presets\nboost = -ea:%gain\nsoft = -efl:%cutoff\n").unwrap();
    let library = library.to_str().unwrap();

    let output = run(&["--presets", library, "check", "--", "-pn:boost,50 -ea:200"]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout(&output).starts_with("-pn:boost,50 -ea:200\n"));

    let output = run(&["--presets", library, "operators"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Presets (-pn:<name>):"));
    assert!(text.contains("-efl:%cutoff"));

    let output = run(&["check", "--", "-pn:boost,50"]);
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

#[test]
fn cli_process_chain() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.wav");
    let output_path = dir.path().join("output.wav");
    write_input(&input, 1, 0.5, 4800);

    let output = run(&[
        "process",
        input.to_str().unwrap(),
        output_path.to_str().unwrap(),
        "--chain=-ea:50 -epp:0",
        "--block-size",
        "256",
        "--bit-depth",
        "24",
    ]);
    assert!(
        output.status.success(),
        "catena process failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let (loaded, spec) = read_wav(&output_path).unwrap();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.bits_per_sample, 24);
    assert_eq!(loaded.len(), 4800 * 2);
    assert!((loaded[0] - 0.25).abs() < 1e-6);
    assert_eq!(loaded[1], 0.0);
}

#[test]
fn cli_process_setup_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.wav");
    let output_path = dir.path().join("output.wav");
    let setup = dir.path().join("session.toml");
    write_input(&input, 2, 0.8, 1000);
    std::fs::write(
        &setup,
        r#"
name = "session"

[settings]
buffer_size = 128
output_bits = 16

[[chains]]
name = "loud"
operators = "-ea:100"

[[chains]]
name = "quiet"
operators = "-ea:25"
"#,
    )
    .unwrap();

    let output = run(&[
        "process",
        input.to_str().unwrap(),
        output_path.to_str().unwrap(),
        "--setup",
        setup.to_str().unwrap(),
        "--chain-name",
        "quiet",
    ]);
    assert!(
        output.status.success(),
        "catena process failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let (loaded, spec) = read_wav(&output_path).unwrap();
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.channels, 2);
    assert!(loaded.iter().all(|&s| (s - 0.2).abs() < 1e-3));
}

#[test]
fn cli_process_requires_chain() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.wav");
    write_input(&input, 1, 0.0, 10);
    let output = run(&[
        "process",
        input.to_str().unwrap(),
        dir.path().join("out.wav").to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No chain specified"));
}

#[test]
fn cli_info_reports_frames() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.wav");
    write_input(&input, 2, 0.0, 4800);
    let output = run(&["info", input.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Channels:    2"));
    assert!(text.contains("4800 frames"));
    assert!(text.contains("Blocks:      5 of 1024 frames"));
}
