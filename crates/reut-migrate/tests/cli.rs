//! Tests for the `reut` binary.

use std::path::Path;
use std::process::{Command, Output};

const SCHEMA: &str = r#"
[[tables]]
name = "posts"

[[tables.columns]]
name = "id"
type = "integer"
nullable = false
primary_key = true

[[tables.columns]]
name = "user_id"
type = "integer"

[[tables.foreign_keys]]
column = "user_id"
references = "users"

[[tables]]
name = "users"

[[tables.columns]]
name = "id"
type = "integer"
nullable = false
primary_key = true

[[tables.columns]]
name = "email"
type = "varchar(255)"
"#;

fn reut(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_reut"))
        .current_dir(dir)
        .env_remove("DATABASE_URL")
        .env_remove("REUT_SCHEMA")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_help_and_version() {
    let dir = tempfile::tempdir().unwrap();

    let out = reut(dir.path(), &["--help"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("migrate"));

    let out = reut(dir.path(), &["-v"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains(env!("CARGO_PKG_VERSION")));

    let out = reut(dir.path(), &["version"]);
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn test_unknown_and_delegated_commands_fail() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(reut(dir.path(), &["explode"]).status.code(), Some(1));
    assert_eq!(reut(dir.path(), &[]).status.code(), Some(1));
    assert_eq!(reut(dir.path(), &["generate:routes"]).status.code(), Some(1));
    assert_eq!(reut(dir.path(), &["generate:model"]).status.code(), Some(1));
}

#[test]
fn test_missing_schema_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("app.db").display());
    let out = reut(dir.path(), &["status", "--database-url", &url]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_create_then_status_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("schema.toml"), SCHEMA).unwrap();
    let url = format!("sqlite://{}", dir.path().join("app.db").display());

    let out = reut(dir.path(), &["create", "--database-url", &url, "--format", "json"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["batch"], 1);
    assert_eq!(report["tables"][0]["table"], "users");
    assert_eq!(report["tables"][1]["operations"][0]["status"], "applied");

    let out = reut(dir.path(), &["status", "--database-url", &url, "--format", "json"]);
    assert_eq!(out.status.code(), Some(0));
    let status: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(status["ledger_exists"], true);
    assert_eq!(status["pending"].as_array().unwrap().len(), 0);
    assert_eq!(status["records"].as_array().unwrap().len(), 2);

    let out = reut(dir.path(), &["migrate", "--database-url", &url]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("nothing to migrate"));
}
