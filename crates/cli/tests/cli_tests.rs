//! CLI integration tests

use std::process::Command;

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "armshift-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("ARM64"), "Should describe the tool");
    assert!(stdout.contains("list"), "Should show list command");
    assert!(stdout.contains("migrate"), "Should show migrate command");
    assert!(stdout.contains("rollback"), "Should show rollback command");
    assert!(stdout.contains("arm-patch"), "Should show arm-patch command");
    assert!(stdout.contains("arm-rollback"), "Should show arm-rollback command");
    assert!(stdout.contains("interactive"), "Should show interactive command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run_cli(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("armshift"), "Should show binary name");
}

/// Test list subcommand help
#[test]
fn test_list_help() {
    let output = run_cli(&["list", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "List help should succeed");
    assert!(stdout.contains("--namespace"), "Should show namespace option");
    assert!(stdout.contains("--check-arm"), "Should show check-arm option");
    assert!(stdout.contains("--probe-timeout"), "Should show probe-timeout option");
}

/// Test batch subcommand help
#[test]
fn test_migrate_help() {
    let output = run_cli(&["migrate", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Migrate help should succeed");
    assert!(stdout.contains("<SELECTION>"), "Should show selection argument");
    assert!(stdout.contains("--yes"), "Should show yes option");
}

/// Test that batch commands describe the constraints they change
#[test]
fn test_batch_command_descriptions() {
    let output = run_cli(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Add the migration toleration and node selector"),
        "migrate should describe the migration markers"
    );
    assert!(
        stdout.contains("Add a soft ARM64 node preference and the arm64 toleration"),
        "arm-patch should describe the preference and toleration"
    );
    assert!(!stdout.contains("Pin workloads"), "arm-patch is a soft preference");
}

/// Test that a batch command without a selection is rejected
#[test]
fn test_migrate_requires_selection() {
    let output = run_cli(&["migrate"]);
    assert!(!output.status.success(), "Missing selection should fail");
}

/// Test that probe timeout needs check-arm
#[test]
fn test_probe_timeout_requires_check_arm() {
    let output = run_cli(&["list", "--probe-timeout", "5"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Probe timeout alone should fail");
    assert!(stderr.contains("--check-arm"), "Should name the missing flag");
}
