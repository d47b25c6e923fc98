use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use replylag::sqlite::ensure_source_schema;
use rusqlite::Connection;
use serde_json::Value;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_PARITY_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{nanos}"))
}

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn replylag(temp: &Path) -> Command {
    let home_dir = temp.join("home");
    std::fs::create_dir_all(&home_dir).expect("home dir should be creatable");
    let mut command = Command::new(env!("CARGO_BIN_EXE_replylag"));
    command
        .arg("--home-dir")
        .arg(&home_dir)
        .arg("--cwd")
        .arg(temp)
        .arg("--db")
        .arg(temp.join("chat.sqlite"));
    command
}

fn ingest_fixtures(temp: &Path) {
    let status = replylag(temp)
        .arg("ingest")
        .arg("--messages")
        .arg(fixture_path("messages.jsonl"))
        .arg("--managers")
        .arg(fixture_path("managers.jsonl"))
        .arg("--supervisors")
        .arg(fixture_path("supervisors.jsonl"))
        .status()
        .expect("command should execute");
    assert_eq!(status.code(), Some(EXIT_SUCCESS));
}

#[test]
fn missing_subcommand_exits_with_usage_code() {
    let status = Command::new(env!("CARGO_BIN_EXE_replylag"))
        .status()
        .expect("command should execute");

    assert_eq!(status.code(), Some(EXIT_USAGE_ERROR));
}

#[test]
fn unknown_flag_exits_with_usage_code() {
    let status = Command::new(env!("CARGO_BIN_EXE_replylag"))
        .args(["report", "--no-such-flag"])
        .status()
        .expect("command should execute");

    assert_eq!(status.code(), Some(EXIT_USAGE_ERROR));
}

#[test]
fn relative_home_dir_exits_with_runtime_code() {
    let status = Command::new(env!("CARGO_BIN_EXE_replylag"))
        .args(["--home-dir", "relative", "report"])
        .status()
        .expect("command should execute");

    assert_eq!(status.code(), Some(EXIT_RUNTIME_FAILURE));
}

#[test]
fn missing_database_exits_with_runtime_code_and_json_error() {
    let temp = unique_temp_dir("replylag-exit-missing-db");
    std::fs::create_dir_all(&temp).expect("temp dir should be creatable");

    let output = replylag(&temp)
        .args(["report", "--json"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_RUNTIME_FAILURE));
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let envelope: Value =
        serde_json::from_str(stdout.trim()).expect("stdout should hold an envelope");
    assert_eq!(envelope["ok"], Value::Bool(false));
    assert_eq!(envelope["error"]["code"], "report_database_missing");

    let _ = std::fs::remove_dir_all(temp);
}

#[test]
fn invalid_business_start_exits_with_runtime_code() {
    let temp = unique_temp_dir("replylag-exit-bad-settings");
    std::fs::create_dir_all(&temp).expect("temp dir should be creatable");
    ingest_fixtures(&temp);

    let status = replylag(&temp)
        .args(["report", "--business-start", "25:00"])
        .status()
        .expect("command should execute");
    assert_eq!(status.code(), Some(EXIT_RUNTIME_FAILURE));

    let _ = std::fs::remove_dir_all(temp);
}

#[test]
fn ingest_report_and_verify_succeed_on_fixtures() {
    let temp = unique_temp_dir("replylag-exit-success");
    std::fs::create_dir_all(&temp).expect("temp dir should be creatable");
    ingest_fixtures(&temp);

    let report = replylag(&temp)
        .args(["report", "--json", "--write-artifact", "--out-dir"])
        .arg(temp.join("out"))
        .output()
        .expect("command should execute");
    assert_eq!(report.status.code(), Some(EXIT_SUCCESS));
    let stdout = String::from_utf8(report.stdout).expect("stdout should be utf-8");
    let envelope: Value =
        serde_json::from_str(stdout.trim()).expect("stdout should hold an envelope");
    assert_eq!(envelope["ok"], Value::Bool(true));
    let names = envelope["data"]["rows"]
        .as_array()
        .expect("rows should be an array")
        .iter()
        .map(|row| row["manager_name"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Ilya", "Pavel", "Daria"]);
    assert_eq!(envelope["warnings"][0]["code"], "unresolved_managers");
    assert!(temp.join("out").join("report.json").is_file());

    let verify = replylag(&temp)
        .arg("verify")
        .status()
        .expect("command should execute");
    assert_eq!(verify.code(), Some(EXIT_SUCCESS));

    let trace = replylag(&temp)
        .args(["trace", "201"])
        .status()
        .expect("command should execute");
    assert_eq!(trace.code(), Some(EXIT_SUCCESS));

    let _ = std::fs::remove_dir_all(temp);
}

#[test]
fn schema_needs_no_database() {
    let output = Command::new(env!("CARGO_BIN_EXE_replylag"))
        .args(["schema", "--compact"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let schemas: Value = serde_json::from_str(stdout.trim()).expect("schemas should be json");
    assert!(schemas.get("message_record").is_some());
    assert!(schemas.get("report_artifact").is_some());
}

#[test]
fn verify_mismatch_exits_with_parity_code() {
    let temp = unique_temp_dir("replylag-exit-parity");
    std::fs::create_dir_all(&temp).expect("temp dir should be creatable");
    let connection =
        Connection::open(temp.join("chat.sqlite")).expect("sqlite database should open");
    ensure_source_schema(&connection).expect("schema should apply");
    // The pipeline reads "4.2e1" as manager 42; SQLite's CAST keeps the
    // integer prefix and joins it to sender 4.
    connection
        .execute_batch(
            "INSERT INTO messages VALUES (1, 0, 1709290800);
             INSERT INTO messages VALUES (1, 4, 1709290860);
             INSERT INTO managers VALUES ('4.2e1', 'Oleg', 1);
             INSERT INTO supervisors VALUES (1, 'Irina');",
        )
        .expect("seed rows should insert");
    drop(connection);

    let output = replylag(&temp)
        .arg("verify")
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_PARITY_FAILURE));
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let report: Value = serde_json::from_str(stdout.trim()).expect("stdout should hold a report");
    assert_eq!(report["pipeline_rows"], 0);
    assert_eq!(report["sql_rows"], 1);
    assert_eq!(report["mismatches"][0]["kind"], "missing_from_pipeline");

    let _ = std::fs::remove_dir_all(temp);
}

#[test]
fn ingest_inputs_expand_home_and_resolve_against_cwd() {
    let temp = unique_temp_dir("replylag-exit-input-paths");
    let exports = temp.join("home").join("exports");
    std::fs::create_dir_all(&exports).expect("exports dir should be creatable");
    std::fs::copy(fixture_path("messages.jsonl"), exports.join("messages.jsonl"))
        .expect("messages fixture should copy");
    std::fs::copy(fixture_path("managers.jsonl"), temp.join("managers.jsonl"))
        .expect("managers fixture should copy");

    let output = replylag(&temp)
        .args([
            "ingest",
            "--messages",
            "~/exports/messages.jsonl",
            "--managers",
            "./nested/../managers.jsonl",
        ])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let report: Value = serde_json::from_str(stdout.trim()).expect("stdout should hold a report");
    assert_eq!(report["messages_read"], 20);
    assert_eq!(report["managers_read"], 4);
    assert_eq!(report["supervisors_read"], 0);

    let _ = std::fs::remove_dir_all(temp);
}
