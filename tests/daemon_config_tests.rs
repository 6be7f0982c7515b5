//! Integration tests for telemd config: file, env overrides, CLI flags, and precedence.

use std::process::Command;

/// Run telemd in a subprocess with the given args and env. Returns (success, stdout, stderr).
fn run_telemd(args: &[&str], env_extra: &[(&str, &str)]) -> (bool, String, String) {
    let exe = env!("CARGO_BIN_EXE_telemd");
    let mut cmd = Command::new(exe);
    cmd.args(args);
    for (k, v) in env_extra {
        cmd.env(k, v);
    }
    let out = cmd.output().expect("run telemd");
    let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
    (out.status.success(), stdout, stderr)
}

#[test]
fn validate_config_no_config_uses_defaults() {
    let (ok, stdout, stderr) = run_telemd(&["--validate-config", "--no-config"], &[]);
    assert!(ok, "stderr: {}", stderr);
    assert!(
        stdout.contains("http_bind=127.0.0.1:8080"),
        "stdout: {}",
        stdout
    );
    assert!(stdout.contains("metric_ttl_secs=60"), "stdout: {}", stdout);
    assert!(
        stdout.contains("metric_sweep_interval_secs=30"),
        "stdout: {}",
        stdout
    );
    assert!(stdout.contains("event_ttl_secs=300"), "stdout: {}", stdout);
}

#[test]
fn validate_config_cli_metric_ttl_overrides() {
    let (ok, stdout, _) = run_telemd(
        &[
            "--validate-config",
            "--no-config",
            "--metric-ttl-secs",
            "120",
        ],
        &[],
    );
    assert!(ok);
    assert!(stdout.contains("metric_ttl_secs=120"), "stdout: {}", stdout);
}

#[test]
fn validate_config_env_overridden_by_cli() {
    let (ok, stdout, _) = run_telemd(
        &[
            "--validate-config",
            "--no-config",
            "--metric-ttl-secs",
            "90",
        ],
        &[("TELEM_METRIC_TTL_SECS", "45")],
    );
    assert!(ok);
    assert!(
        stdout.contains("metric_ttl_secs=90"),
        "CLI should win: {}",
        stdout
    );
}

#[test]
fn validate_config_env_override_with_no_config() {
    let (ok, stdout, _) = run_telemd(
        &["--validate-config", "--no-config"],
        &[("TELEM_METRIC_TTL_SECS", "45")],
    );
    assert!(ok);
    assert!(stdout.contains("metric_ttl_secs=45"), "stdout: {}", stdout);
}

#[test]
fn valid_config_file_merges_with_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("telemd.toml");
    std::fs::write(
        &config_path,
        r#"
http_bind = "127.0.0.1:9090"
metric_ttl_secs = 15
event_sweep_interval_secs = 7
"#,
    )
    .expect("write config");
    let (ok, stdout, stderr) = run_telemd(
        &[
            "--validate-config",
            "--config",
            config_path.to_str().unwrap(),
        ],
        &[],
    );
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("http_bind=127.0.0.1:9090"));
    assert!(stdout.contains("metric_ttl_secs=15"));
    assert!(stdout.contains("event_sweep_interval_secs=7"));
    // Untouched fields keep their defaults.
    assert!(stdout.contains("event_ttl_secs=300"));
}

#[test]
fn explicit_config_missing_file_fails() {
    let (ok, _stdout, stderr) = run_telemd(
        &["--validate-config", "--config", "/nonexistent/telemd.toml"],
        &[],
    );
    assert!(!ok, "missing config file with explicit --config should fail");
    assert!(
        stderr.contains("not found") || stderr.contains("config error"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn invalid_http_bind_fails() {
    let (ok, _stdout, stderr) = run_telemd(
        &[
            "--validate-config",
            "--no-config",
            "--http-bind",
            "not-a-valid-address",
        ],
        &[],
    );
    assert!(!ok, "invalid http_bind should fail");
    assert!(
        stderr.contains("invalid http_bind") || stderr.contains("config error"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn zero_sweep_interval_in_config_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("telemd.toml");
    std::fs::write(
        &config_path,
        r#"
metric_sweep_interval_secs = 0
"#,
    )
    .expect("write config");
    let (ok, _stdout, stderr) = run_telemd(
        &[
            "--validate-config",
            "--config",
            config_path.to_str().unwrap(),
        ],
        &[],
    );
    assert!(!ok, "zero sweep interval should fail");
    assert!(
        stderr.contains("sweep interval") || stderr.contains("config error"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn zero_ttl_in_config_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("telemd.toml");
    std::fs::write(
        &config_path,
        r#"
event_ttl_secs = 0
"#,
    )
    .expect("write config");
    let (ok, _stdout, stderr) = run_telemd(
        &[
            "--validate-config",
            "--config",
            config_path.to_str().unwrap(),
        ],
        &[],
    );
    assert!(!ok, "zero TTL should fail");
    assert!(
        stderr.contains("TTL") || stderr.contains("config error"),
        "stderr: {}",
        stderr
    );
}
