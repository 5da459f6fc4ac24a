//! Integration tests: run the socket binary and check exit codes and output.

use std::process::{Command, Output};

use tempfile::TempDir;

fn socket(data_dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_socket"));
    cmd.env("SOCKET_CLI_DATA_DIR", data_dir.path())
        .env("SOCKET_CLI_NO_UPDATE_NOTIFIER", "1")
        .env_remove("SOCKET_CLI_API_TOKEN")
        .env_remove("SOCKET_CLI_CONFIG");
    cmd
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn test_help() {
    let td = TempDir::new().unwrap();
    let out = socket(&td).arg("--help").output().unwrap();
    assert!(out.status.success(), "socket --help should succeed");
    let text = stdout(&out);
    assert!(text.contains("config"));
    assert!(text.contains("scan"));
    assert!(text.contains("npm"));
    assert!(text.contains("pnpm"));
}

#[test]
fn test_version() {
    let td = TempDir::new().unwrap();
    let out = socket(&td).arg("--version").output().unwrap();
    assert!(out.status.success());
    assert!(stdout(&out).contains("socket"));
}

#[test]
fn test_config_set_then_get_json() {
    let td = TempDir::new().unwrap();
    let out = socket(&td)
        .args(["config", "set", "apiProxy", "https://example.com"])
        .output()
        .unwrap();
    assert!(out.status.success(), "config set should succeed");

    let out = socket(&td)
        .args(["config", "get", "apiProxy", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_str(stdout(&out).trim()).expect("one JSON object");
    assert_eq!(v["success"], serde_json::json!(true));
    assert_eq!(v["result"]["key"], serde_json::json!("apiProxy"));
    assert_eq!(v["result"]["value"], serde_json::json!("https://example.com"));
}

#[test]
fn test_config_unset_clears_value() {
    let td = TempDir::new().unwrap();
    socket(&td)
        .args(["config", "set", "defaultOrg", "my-org"])
        .output()
        .unwrap();
    socket(&td)
        .args(["config", "unset", "defaultOrg"])
        .output()
        .unwrap();
    let out = socket(&td)
        .args(["config", "get", "defaultOrg", "--json"])
        .output()
        .unwrap();
    let v: serde_json::Value = serde_json::from_str(stdout(&out).trim()).unwrap();
    assert_eq!(v["result"]["value"], serde_json::Value::Null);
}

#[test]
fn test_json_and_markdown_conflict_exits_2() {
    let td = TempDir::new().unwrap();
    let out = socket(&td)
        .args(["config", "get", "apiProxy", "--json", "--markdown"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stdout(&out).trim().is_empty(), "no data output on usage error");
}

#[test]
fn test_unknown_config_key_exits_2() {
    let td = TempDir::new().unwrap();
    let out = socket(&td)
        .args(["config", "set", "notAKey", "value"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_dry_run_valid_input_exits_0_without_network() {
    let td = TempDir::new().unwrap();
    let out = socket(&td)
        .args(["config", "set", "defaultOrg", "my-org", "--dry-run"])
        .output()
        .unwrap();
    assert!(out.status.success());

    // Dry run must not apply the mutation.
    let out = socket(&td)
        .args(["config", "get", "defaultOrg", "--json"])
        .output()
        .unwrap();
    let v: serde_json::Value = serde_json::from_str(stdout(&out).trim()).unwrap();
    assert_eq!(v["result"]["value"], serde_json::Value::Null);
}

#[test]
fn test_dry_run_invalid_input_exits_2() {
    let td = TempDir::new().unwrap();
    let out = socket(&td)
        .args(["config", "set", "bogusKey", "x", "--dry-run"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_api_command_without_token_is_auth_failure() {
    let td = TempDir::new().unwrap();
    let out = socket(&td)
        .args(["organization", "list"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("API token"), "auth error should name the token: {}", err);
}

#[test]
fn test_config_list_redacts_token() {
    let td = TempDir::new().unwrap();
    socket(&td)
        .args(["config", "set", "apiToken", "sk-secret-value"])
        .output()
        .unwrap();
    let out = socket(&td)
        .args(["config", "list", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(!text.contains("sk-secret-value"));
    assert!(text.contains("<redacted>"));
}

#[test]
fn test_config_override_is_read_only() {
    let td = TempDir::new().unwrap();
    let blob = r#"{"apiProxy":"https://proxy.example"}"#;
    let out = socket(&td)
        .args(["config", "get", "apiProxy", "--json"])
        .env("SOCKET_CLI_CONFIG", blob)
        .output()
        .unwrap();
    let v: serde_json::Value = serde_json::from_str(stdout(&out).trim()).unwrap();
    assert_eq!(v["result"]["value"], serde_json::json!("https://proxy.example"));

    // A set under an override must not create the settings file.
    socket(&td)
        .args(["config", "set", "apiProxy", "https://other.example"])
        .env("SOCKET_CLI_CONFIG", blob)
        .output()
        .unwrap();
    assert!(!td.path().join("settings").exists());
}

#[test]
fn test_scan_create_dry_run_validates_manifest_presence() {
    let td = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    let out = socket(&td)
        .args(["scan", "create", "--dry-run"])
        .current_dir(project.path())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2), "no package.json -> usage error");

    std::fs::write(
        project.path().join("package.json"),
        r#"{ "name": "app", "dependencies": { "lodash": "4.17.21" } }"#,
    )
    .unwrap();
    let out = socket(&td)
        .args(["scan", "create", "--dry-run"])
        .current_dir(project.path())
        .output()
        .unwrap();
    assert!(out.status.success(), "valid input -> dry run exits 0");
}

#[test]
fn test_analytics_repo_scope_requires_repo() {
    let td = TempDir::new().unwrap();
    let out = socket(&td)
        .args(["analytics", "--scope", "repo"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_pnpm_non_install_command_passthrough_fails_without_pnpm() {
    let td = TempDir::new().unwrap();
    // No pnpm on PATH: wrapper reports a runtime failure, not a panic.
    let out = socket(&td)
        .args(["pnpm", "run", "build"])
        .env("PATH", td.path())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
}
