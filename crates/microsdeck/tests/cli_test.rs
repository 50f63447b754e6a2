//! Integration tests for the `microsdeck` CLI binary.
//!
//! Argument parsing, help output, completions and error exit codes run
//! without a backend; the rest drive the binary against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::process::Output;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `microsdeck` binary with env isolation.
///
/// Clears all `MICROSDECK_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn microsdeck_cmd_in(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("microsdeck");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("MICROSDECK_URL")
        .env_remove("MICROSDECK_OUTPUT")
        .env_remove("MICROSDECK_TIMEOUT")
        .env_remove("MICROSDECK_LISTEN_TIMEOUT")
        .env_remove("MICROSDECK_LISTEN_MODE");
    cmd
}

fn microsdeck_cmd() -> assert_cmd::Command {
    microsdeck_cmd_in(Path::new("/tmp/microsdeck-cli-test-nonexistent"))
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary against `server` without blocking the async runtime.
async fn run_against(server: &MockServer, args: &[&str]) -> Output {
    let mut cmd = microsdeck_cmd();
    cmd.arg("--url").arg(server.uri()).args(args);
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn card_entry(uid: &str, name: &str, position: u32) -> serde_json::Value {
    json!([
        { "uid": uid, "libid": format!("lib-{uid}"), "name": name, "position": position, "hidden": false },
        [{ "uid": "570", "name": "Dota 2", "size": 1_073_741_824_u64, "is_steam": true }]
    ])
}

async fn mount_backend(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("0.10.4"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(card_entry("abc", "Red", 1)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            card_entry("abc", "Red", 1),
            card_entry("def", "Blue", 0)
        ])))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = microsdeck_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    microsdeck_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("MicroSDeck")
            .and(predicate::str::contains("cards"))
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    microsdeck_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("microsdeck"));
}

#[test]
fn test_cards_subcommands_exist() {
    microsdeck_cmd()
        .args(["cards", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("rename"))
                .and(predicate::str::contains("reorder"))
                .and(predicate::str::contains("link"))
                .and(predicate::str::contains("unlink")),
        );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    microsdeck_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    microsdeck_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = microsdeck_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    let output = microsdeck_cmd()
        .args(["--output", "invalid", "status"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_unreachable_backend_exits_with_connection_code() {
    microsdeck_cmd()
        .args(["--url", "http://127.0.0.1:1", "--timeout", "2", "status"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Could not reach"));
}

#[test]
fn test_invalid_url_is_a_usage_error() {
    microsdeck_cmd()
        .args(["--url", "not a url", "status"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("url"));
}

#[test]
fn test_unknown_setting_is_rejected_before_any_request() {
    microsdeck_cmd()
        .args(["--url", "http://127.0.0.1:1", "settings", "get", "backend:nope"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown setting"));
}

// ── Config file ─────────────────────────────────────────────────────

#[test]
fn test_config_init_then_show() {
    let home = tempfile::tempdir().unwrap();

    microsdeck_cmd_in(home.path())
        .args(["--url", "http://steamdeck.local:12412", "config", "init", "--yes"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Config written to"));

    microsdeck_cmd_in(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://steamdeck.local:12412"));
}

#[test]
fn test_config_path_points_into_config_home() {
    let home = tempfile::tempdir().unwrap();
    microsdeck_cmd_in(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Against a backend ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_reports_version_and_inserted_card() {
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let output = run_against(&server, &["-o", "json", "status"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["version"], "0.10.4");
    assert_eq!(status["enabled"], true);
    assert_eq!(status["current_card"], "abc");
    assert_eq!(status["cards"], 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cards_list_plain_is_sorted_by_position() {
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let output = run_against(&server, &["-o", "plain", "cards", "list"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "def\nabc\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cards_games_for_unknown_card_is_not_found() {
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let output = run_against(&server, &["cards", "games", "zzz"]).await;
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rename_not_applied_by_backend_fails() {
    let server = MockServer::start().await;
    mount_backend(&server).await;
    Mock::given(method("POST"))
        .and(path("/card/abc"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_against(&server, &["cards", "rename", "abc", "Green"]).await;
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("did not apply"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_requires_confirmation_when_not_interactive() {
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let output = run_against(&server, &["cards", "delete", "abc"]).await;
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}
