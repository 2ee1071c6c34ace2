//! Command-line tests for the `ddp-validator` binary
//!
//! Programs are small shell scripts launched through `sh`.

#![cfg(unix)]
#![allow(clippy::panic_in_result_fn)]

use assert_fs::prelude::*;
use predicates::prelude::*;

const GREETER: &str = "printf 'Name: '\nread name\necho \"Hello $name\"\n";

const PASSING_SUITE: &str = r#"
language = "python"

[greeting]
input = "Ada"
output = """
Name: Ada
Hello Ada
"""
"#;

const FAILING_SUITE: &str = r#"
language = "python"

[greeting]
input = "Ada"
output = """
Name: Ada
Goodbye Ada
"""
"#;

fn validator() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("ddp-validator"));
    cmd.args(["--no-config", "--python", "sh", "--warmup-ms", "300"])
        .args(["--read-timeout-ms", "100", "--inactivity-ceiling-ms", "1500"]);
    cmd
}

#[test]
fn help_lists_options() {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("ddp-validator"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--suite"))
        .stdout(predicate::str::contains("--classifier"));
}

#[test]
fn suite_or_classifier_is_required() -> anyhow::Result<()> {
    let temp_dir = assert_fs::TempDir::new()?;
    temp_dir.child("main.py").write_str(GREETER)?;

    validator().arg(temp_dir.path()).assert().failure();
    Ok(())
}

#[test]
fn passing_suite_exits_successfully() -> anyhow::Result<()> {
    let temp_dir = assert_fs::TempDir::new()?;
    temp_dir.child("main.py").write_str(GREETER)?;
    let suite = temp_dir.child("suite.toml");
    suite.write_str(PASSING_SUITE)?;

    validator()
        .arg(temp_dir.path())
        .arg("--suite")
        .arg(suite.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("greeting"))
        .stdout(predicate::str::contains("All checks passed!"));

    Ok(())
}

#[test]
fn failing_suite_exits_with_failure() -> anyhow::Result<()> {
    let temp_dir = assert_fs::TempDir::new()?;
    let program = temp_dir.child("main.py");
    program.write_str(GREETER)?;
    let suite = temp_dir.child("suite.toml");
    suite.write_str(FAILING_SUITE)?;
    let artifacts = temp_dir.child("artifacts");
    artifacts.create_dir_all()?;

    validator()
        .arg(program.path())
        .arg("--suite")
        .arg(suite.path())
        .arg("--artifact-dir")
        .arg(artifacts.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Some checks have failed"));

    artifacts
        .child("difference-greeting.html")
        .assert(predicate::path::is_file());

    Ok(())
}

#[test]
fn terse_format_prints_counts() -> anyhow::Result<()> {
    let temp_dir = assert_fs::TempDir::new()?;
    temp_dir.child("main.py").write_str(GREETER)?;
    let suite = temp_dir.child("suite.toml");
    suite.write_str(PASSING_SUITE)?;

    validator()
        .arg(temp_dir.path())
        .args(["--format", "terse", "--suite"])
        .arg(suite.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1/1 passed"));

    Ok(())
}

#[test]
fn junit_format_writes_xml() -> anyhow::Result<()> {
    let temp_dir = assert_fs::TempDir::new()?;
    temp_dir.child("main.py").write_str(GREETER)?;
    let suite = temp_dir.child("suite.toml");
    suite.write_str(PASSING_SUITE)?;

    validator()
        .arg(temp_dir.path())
        .args(["--format", "junit", "--suite"])
        .arg(suite.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("<testsuite"))
        .stdout(predicate::str::contains("greeting"));

    Ok(())
}

#[test]
fn ambiguous_directory_lists_candidates() -> anyhow::Result<()> {
    let temp_dir = assert_fs::TempDir::new()?;
    temp_dir.child("first.py").write_str(GREETER)?;
    temp_dir.child("second.py").write_str(GREETER)?;
    let suite = temp_dir.child("suite.toml");
    suite.write_str(PASSING_SUITE)?;

    validator()
        .arg(temp_dir.path())
        .arg("--suite")
        .arg(suite.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("first.py"))
        .stderr(predicate::str::contains("second.py"));

    Ok(())
}

#[test]
fn classifier_selects_suite() -> anyhow::Result<()> {
    let temp_dir = assert_fs::TempDir::new()?;
    temp_dir
        .child("lab/main.py")
        .write_str(&std::format!("# TASK-GREET\n{GREETER}"))?;
    temp_dir
        .child("data/suites/greet.toml")
        .write_str(PASSING_SUITE)?;
    temp_dir
        .child("data/suites/other.toml")
        .write_str(FAILING_SUITE)?;
    let classifier = temp_dir.child("data/classifier.json");
    classifier.write_str(
        r#"[
            {"name": "Other", "identifier": "TASK-OTHER", "path": "suites/other.toml"},
            {"name": "Greeting", "identifier": "TASK-GREET", "path": "suites/greet.toml"}
        ]"#,
    )?;

    validator()
        .arg(temp_dir.child("lab").path())
        .arg("--classifier")
        .arg(classifier.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Task: Greeting"))
        .stdout(predicate::str::contains("All checks passed!"));

    Ok(())
}

#[test]
fn broken_explicit_config_is_fatal() -> anyhow::Result<()> {
    let temp_dir = assert_fs::TempDir::new()?;
    temp_dir.child("main.py").write_str(GREETER)?;
    let suite = temp_dir.child("suite.toml");
    suite.write_str(PASSING_SUITE)?;
    let config = temp_dir.child("config.toml");
    config.write_str("[timings\n")?;

    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("ddp-validator"))
        .arg(temp_dir.path())
        .arg("--suite")
        .arg(suite.path())
        .arg("--config")
        .arg(config.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config.toml"));

    Ok(())
}

#[test]
fn config_file_supplies_launch_settings() -> anyhow::Result<()> {
    let temp_dir = assert_fs::TempDir::new()?;
    temp_dir.child("main.py").write_str(GREETER)?;
    let suite = temp_dir.child("suite.toml");
    suite.write_str(PASSING_SUITE)?;
    let config = temp_dir.child("config.toml");
    config.write_str(
        "[timings]\nwarmup-ms = 300\nread-timeout-ms = 100\n\n[launch]\npython = \"sh\"\n",
    )?;

    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("ddp-validator"))
        .arg(temp_dir.path())
        .arg("--suite")
        .arg(suite.path())
        .arg("--config")
        .arg(config.path())
        .assert()
        .success();

    Ok(())
}

/// Records its process id, then waits long past any test timeout.
#[cfg(target_os = "linux")]
const WAITING_PROGRAM: &str = "echo $$ > child.pid\nexec sleep 600\n";

#[cfg(target_os = "linux")]
const WAITING_SUITE: &str = r#"
language = "java"

[waits]
input = "go"
output = "never"
"#;

#[cfg(target_os = "linux")]
const DEADLINE: std::time::Duration = std::time::Duration::from_secs(10);

#[cfg(target_os = "linux")]
fn poll_until<T>(mut check: impl FnMut() -> anyhow::Result<Option<T>>) -> anyhow::Result<T> {
    let start = std::time::Instant::now();
    while start.elapsed() < DEADLINE {
        if let Some(value) = check()? {
            return Ok(value);
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    anyhow::bail!("timed out after {DEADLINE:?}")
}

#[cfg(target_os = "linux")]
fn is_running(pid: nix::unistd::Pid) -> bool {
    if nix::sys::signal::kill(pid, None).is_err() {
        return false;
    }

    // Zombies accept signals until reaped.
    std::fs::read_to_string(std::format!("/proc/{pid}/stat"))
        .is_ok_and(|stat| !stat.contains(") Z "))
}

/// Starts a run against a program that never finishes, stops the harness with
/// `signal` once the program is up, and checks that nothing is left behind.
#[cfg(target_os = "linux")]
fn stop_run_with(signal: nix::sys::signal::Signal) -> anyhow::Result<()> {
    use anyhow::Context;
    use std::io::Read;
    use std::process::Stdio;

    let temp_dir = assert_fs::TempDir::new()?;
    let program = temp_dir.child("Main.java");
    program.touch()?;
    temp_dir.child("Main").write_str(WAITING_PROGRAM)?;
    let leftover = temp_dir.child("Leftover.class");
    leftover.touch()?;
    let suite = temp_dir.child("suite.toml");
    suite.write_str(WAITING_SUITE)?;

    let mut harness = std::process::Command::new(assert_cmd::cargo::cargo_bin!("ddp-validator"))
        .arg(program.path())
        .arg("--suite")
        .arg(suite.path())
        .args(["--no-config", "--java", "sh", "--format", "junit"])
        .args(["--warmup-ms", "100", "--inactivity-ceiling-ms", "60000"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let pid_file = temp_dir.child("child.pid");
    let child_pid = poll_until(|| {
        let text = std::fs::read_to_string(pid_file.path()).unwrap_or_default();
        Ok(text.trim().parse::<i32>().ok())
    })
    .map(nix::unistd::Pid::from_raw)?;

    nix::sys::signal::kill(nix::unistd::Pid::from_raw(i32::try_from(harness.id())?), signal)?;

    let status = poll_until(|| Ok(harness.try_wait()?))?;
    assert_eq!(status.code(), Some(1));

    let mut stdout = String::new();
    harness
        .stdout
        .take()
        .context("stdout not captured")?
        .read_to_string(&mut stdout)?;
    assert!(stdout.contains("<testsuite"), "report not flushed: {stdout}");

    leftover.assert(predicate::path::missing());
    poll_until(|| Ok((!is_running(child_pid)).then_some(())))?;

    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn interrupt_kills_program_and_cleans_up() -> anyhow::Result<()> {
    stop_run_with(nix::sys::signal::Signal::SIGINT)
}

#[cfg(target_os = "linux")]
#[test]
fn terminate_kills_program_and_cleans_up() -> anyhow::Result<()> {
    stop_run_with(nix::sys::signal::Signal::SIGTERM)
}

#[cfg(target_os = "linux")]
#[test]
fn hangup_kills_program_and_cleans_up() -> anyhow::Result<()> {
    stop_run_with(nix::sys::signal::Signal::SIGHUP)
}
