//! CLI integration tests
//!
//! Runs the real binary: a dry-run daemon on a temp socket plus client subcommands.

use std::path::Path;
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn binary_command(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("craftd"));
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env_remove("RUST_LOG");
    cmd
}

/// Start `craftd serve --dry-run` and wait for its socket
fn spawn_daemon(home: &Path, socket: &Path) -> Child {
    let child = std::process::Command::new(assert_cmd::cargo::cargo_bin!("craftd"))
        .args(["serve", "--dry-run", "--socket"])
        .arg(socket)
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_CONFIG_HOME", home.join("config"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn daemon");

    let deadline = Instant::now() + Duration::from_secs(10);
    while !socket.exists() {
        assert!(Instant::now() < deadline, "daemon socket never appeared");
        std::thread::sleep(Duration::from_millis(50));
    }
    child
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    binary_command(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("accept"))
        .stdout(predicate::str::contains("entry-point"));
}

#[test]
fn test_ping_without_daemon() {
    let home = TempDir::new().unwrap();
    let socket = home.path().join("missing.sock");
    binary_command(home.path())
        .arg("ping")
        .arg("--socket")
        .arg(&socket)
        .assert()
        .success()
        .stdout(predicate::str::contains("craftd is not running"));
}

#[test]
fn test_status_without_daemon_fails() {
    let home = TempDir::new().unwrap();
    let socket = home.path().join("missing.sock");
    binary_command(home.path())
        .arg("status")
        .arg("--socket")
        .arg(&socket)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to query daemon"));
}

#[test]
fn test_serve_rejects_missing_token() {
    let home = TempDir::new().unwrap();
    binary_command(home.path())
        .env_remove("DISCORD_TOKEN")
        .arg("serve")
        .arg("--socket")
        .arg(home.path().join("craftd.sock"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("DISCORD_TOKEN"));
}

#[test]
fn test_dry_run_daemon_round_trip() {
    let home = TempDir::new().unwrap();
    let socket = home.path().join("run").join("craftd.sock");
    let mut daemon = spawn_daemon(home.path(), &socket);

    binary_command(home.path())
        .args(["submit", "Oak Table", "--user", "42", "--confirm", "no", "--socket"])
        .arg(&socket)
        .assert()
        .success()
        .stdout(predicate::str::contains("Type **YES**"));

    binary_command(home.path())
        .args(["submit", "Oak Table", "--user", "42", "--confirm", "yes", "--socket"])
        .arg(&socket)
        .assert()
        .success()
        .stdout(predicate::str::contains("Sent to **0** crafter(s)"));

    binary_command(home.path())
        .args(["status", "--format", "json", "--socket"])
        .arg(&socket)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pending\": 1"));

    binary_command(home.path())
        .args(["accept", "nothere1", "--user", "7", "--socket"])
        .arg(&socket)
        .assert()
        .success()
        .stdout(predicate::str::contains("Data missing"));

    binary_command(home.path())
        .args(["press", "craft:start", "--user", "42", "--socket"])
        .arg(&socket)
        .assert()
        .success()
        .stdout(predicate::str::contains("Request form opened"));

    binary_command(home.path())
        .args(["press", "craft:accept:nothere1", "--user", "7", "--socket"])
        .arg(&socket)
        .assert()
        .success()
        .stdout(predicate::str::contains("Data missing"));

    binary_command(home.path())
        .args(["stop", "--socket"])
        .arg(&socket)
        .assert()
        .success();

    let status = daemon.wait().expect("daemon exit");
    assert!(status.success());
}
