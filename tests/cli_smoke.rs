use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_fxfuse")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) { "fxfuse.exe" } else { "fxfuse" });
            p
        })
}

#[test]
fn cli_fuse_writes_code_and_report() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let out_path = dir.join("fused.js");
    let report_path = dir.join("report.json");
    let _ = std::fs::remove_file(&out_path);
    let _ = std::fs::remove_file(&report_path);

    let out_arg = out_path.to_string_lossy().to_string();
    let report_arg = report_path.to_string_lossy().to_string();

    let status = std::process::Command::new(exe())
        .args([
            "fuse",
            "--in",
            "tests/data/particles.js",
            "--level",
            "2",
            "--innovation-level",
            "10",
            "--out",
        ])
        .arg(out_arg.as_str())
        .args(["--report", report_arg.as_str(), "--text-report"])
        .status()
        .unwrap();

    assert!(status.success());
    let code = std::fs::read_to_string(&out_path).unwrap();
    assert!(code.starts_with("class FusedEffect{"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["strategy"], "balanced");
    assert_eq!(report["reconstruction_level"], 2);
    assert_eq!(report["metrics"]["compressed_bytes"], code.len());
}

#[test]
fn cli_rejects_unknown_level() {
    let output = std::process::Command::new(exe())
        .args(["fuse", "--in", "tests/data/particles.js", "--level", "7"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid level 7"), "{stderr}");
}

#[test]
fn cli_lists_modules_and_levels() {
    let output = std::process::Command::new(exe())
        .args(["modules", "--level", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next().unwrap();
    assert!(first.starts_with("contextual_harmony"));
    assert!(first.ends_with("universal"));
    assert_eq!(stdout.lines().count(), 4);

    let output = std::process::Command::new(exe())
        .args(["levels", "--config", "tests/data/config.json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("level 2: aggressive"));
}
