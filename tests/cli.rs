// CLI integration tests; none of these need a reachable database.
use std::io::Write;
use std::process::Command;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_ictest");
    let mut command = Command::new(exe);
    command.env_remove("ICTEST_PASSWORD");
    command.env_remove("RUST_LOG");
    command
}

#[test]
fn help_lists_connection_flags() {
    let output = cmd().arg("--help").output().expect("help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--conn"));
    assert!(stdout.contains("--config"));
    assert!(stdout.contains("Username"));
    assert!(stdout.contains("Password"));
    assert!(stdout.contains("Log at debug level"));
}

#[test]
fn missing_connection_string_fails() {
    let output = cmd()
        .args(["--username", "scott", "--password", "tiger"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Connection string is required"));
}

#[test]
fn unreadable_config_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("nope.toml");
    let output = cmd()
        .args(["--config", missing.to_str().unwrap()])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn invalid_config_fails() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "[database]\nusername = 42").expect("write");
    let output = cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid config file"));
}

#[test]
fn unknown_format_fails_before_connecting() {
    let output = cmd()
        .args([
            "--conn", "127.0.0.1:1/NONE", "--username", "u", "--password", "p", "--format", "xml",
        ])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown output format: xml"));
    assert!(!stderr.contains("Failed to connect"));
}

#[test]
fn connection_failure_exits_with_status_one() {
    // Port 1 refuses immediately, and without an Oracle client the driver fails even earlier.
    let output = cmd()
        .args(["--conn", "127.0.0.1:1/NONE", "--username", "u", "--password", "p"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(
        "Failed to connect to the Oracle database. Message from the Oracle client follows:"
    ));
}

fn failing_run_with_log(extra: &[&str], rust_log: Option<&str>) -> (std::process::Output, String) {
    let temp = tempfile::tempdir().expect("tempdir");
    let log_path = temp.path().join("run.log");
    let mut command = cmd();
    command
        .args(["--conn", "127.0.0.1:1/NONE", "--username", "u", "--password", "p"])
        .args(["--log-file", log_path.to_str().unwrap()])
        .args(extra);
    if let Some(filter) = rust_log {
        command.env("RUST_LOG", filter);
    }
    let output = command.output().expect("run");
    let log = std::fs::read_to_string(&log_path).expect("log file");
    (output, log)
}

#[test]
fn log_file_takes_the_logs() {
    let (output, log) = failing_run_with_log(&[], None);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(log.contains("INFO"));
    assert!(log.contains("Connecting to 127.0.0.1:1/NONE"));
    assert!(!log.contains("DEBUG"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("Connecting to"));
    assert!(stderr.contains("Failed to connect to the Oracle database"));
}

#[test]
fn verbose_logs_debug_lines() {
    let (output, log) = failing_run_with_log(&["-v"], None);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(log.contains("DEBUG"));
    assert!(log.contains("Connecting to //127.0.0.1:1/NONE as u"));
}

#[test]
fn rust_log_overrides_verbose_flag() {
    let (_, log) = failing_run_with_log(&["-v"], Some("warn"));
    assert!(!log.contains("Connecting to"));

    let (_, log) = failing_run_with_log(&[], Some("debug"));
    assert!(log.contains("DEBUG"));
}
