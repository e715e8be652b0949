//! End-to-end runs of the `volta` binary.

use std::path::Path;
use std::process::{Command, Output};

fn volta(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_volta"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn volta")
}

fn design_dir(extra: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("volta.toml"),
        format!("[design]\nname = \"blinky\"\ntop = \"demo.Blinky\"\n{extra}"),
    )
    .unwrap();
    dir
}

#[test]
fn build_writes_outputs_and_inspect_reads_them() {
    let dir = design_dir("[output]\nnetlist = \"build/netlist.json\"\n");
    let out = volta(dir.path(), &["--quiet", "build", "--emit", "design.volt"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let netlist: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("build/netlist.json")).unwrap())
            .unwrap();
    assert_eq!(netlist["parts"].as_array().unwrap().len(), 5);

    let out = volta(dir.path(), &["inspect", "design.volt"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("top:       demo.Blinky"), "{stdout}");
}

#[test]
fn json_report_over_the_wire() {
    let dir = design_dir("");
    let out = volta(dir.path(), &["build", "--format", "json", "--wire"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["ok"], true);
    assert_eq!(report["generator_rounds"], 1);
    assert_eq!(report["round_trips"], 2);
    assert_eq!(report["check"]["violated"], 0);
}

#[test]
fn failed_refinement_exits_nonzero() {
    let dir = design_dir("[refinements.paths]\n\"reg\" = \"demo.Led\"\n");
    let out = volta(dir.path(), &["--color", "never", "build"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error[E104]"), "{stderr}");
    assert!(!dir.path().join("build").exists());
}

#[test]
fn list_power_module() {
    let dir = tempfile::tempdir().unwrap();
    let out = volta(dir.path(), &["list", "power"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.contains("power.Regulator"));
}

#[test]
fn missing_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let out = volta(dir.path(), &["build"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("could not find volta.toml"));
}
