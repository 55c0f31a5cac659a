// Integration tests driving the dpk binary.
//
// Every test points DATAPACKET_CONFIG at a temp settings file so the user's
// real configuration is never read or created.
//
// Run with: cargo test -p datapacket-cli --test cli_tests -- --nocapture

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde_json::{json, Value};
use tempfile::TempDir;

const SALES: &str = "Region,Revenue\nNorth,100\nSouth,bad\nNorth,20\n";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self { dir: tempfile::tempdir().unwrap() };
        fixture.settings(r#"{"ai": {"provider": "none"}}"#);
        fixture
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn settings(&self, content: &str) {
        self.file("settings.json", content);
    }

    fn dpk(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_dpk"));
        cmd.env("DATAPACKET_CONFIG", self.dir.path().join("settings.json"))
            .env_remove("DATAPACKET_GROQ_KEY")
            .env_remove("GROQ_API_KEY")
            .env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.dpk().args(args).output().expect("run dpk")
    }

    fn run_with_stdin(&self, args: &[&str], stdin: &str) -> Output {
        let mut child = self
            .dpk()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn dpk");
        child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
        child.wait_with_output().expect("wait dpk")
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {}\nstdout:\n{}", e, stdout))
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().expect("exited normally")
}

// ---------------------------------------------------------------------------
// infer
// ---------------------------------------------------------------------------

#[test]
fn infer_json_reports_types() {
    let fx = Fixture::new();
    let csv = fx.file("deals.csv", "Name,Amount,Closed\nAcme,10,2024-01-05\nGlobex,2.5,2024-02-10\n");

    let output = fx.run(&["infer", path_str(&csv), "--json"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let val = stdout_json(&output);
    assert_eq!(
        val["columns"],
        json!([
            {"name": "Name", "type": "text"},
            {"name": "Amount", "type": "number"},
            {"name": "Closed", "type": "date"}
        ])
    );
    assert_eq!(val["row_count"], 2);
}

#[test]
fn infer_text_table() {
    let fx = Fixture::new();
    let csv = fx.file("sales.csv", SALES);
    let output = fx.run(&["infer", path_str(&csv)]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("column   type\n"), "stdout:\n{}", stdout);
    assert!(stdout.contains("Revenue  text"));
    assert!(stdout.trim_end().ends_with("3 rows"));
}

#[test]
fn unsupported_extension_is_usage_error() {
    let fx = Fixture::new();
    let path = fx.file("data.json", "[]");
    let output = fx.run(&["infer", path_str(&path)]);
    assert_eq!(exit_code(&output), 2);
    assert!(String::from_utf8_lossy(&output.stderr).contains("hint:"));
}

#[test]
fn header_only_file_is_schema_error() {
    let fx = Fixture::new();
    let path = fx.file("empty.csv", "A,B\n");
    let output = fx.run(&["infer", path_str(&path)]);
    assert_eq!(exit_code(&output), 5);
    assert!(String::from_utf8_lossy(&output.stderr).contains("No data found."));
}

// ---------------------------------------------------------------------------
// query
// ---------------------------------------------------------------------------

#[test]
fn query_sum_skips_unparseable_values() {
    let fx = Fixture::new();
    let csv = fx.file("sales.csv", SALES);

    let output = fx.run(&[
        "query", path_str(&csv), "--as", "Revenue=number", "--agg", "sum", "--agg-column", "Revenue", "--json",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let val = stdout_json(&output);
    assert_eq!(val["aggregate"]["value"], json!(120));
    assert_eq!(val["aggregate"]["display"], json!("120"));
    assert_eq!(val["row_count"], 3);
}

#[test]
fn query_text_prints_aggregate_line() {
    let fx = Fixture::new();
    let csv = fx.file("sales.csv", SALES);
    let output = fx.run(&["query", path_str(&csv), "--as", "Revenue=number", "--agg", "avg", "--agg-column", "Revenue"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().last(), Some("avg(Revenue): 60"));
}

#[test]
fn query_contains_filter() {
    let fx = Fixture::new();
    let csv = fx.file("sales.csv", SALES);

    let output = fx.run(&["query", path_str(&csv), "--filter", "Region", "--value", "no", "--json"]);
    let val = stdout_json(&output);
    assert_eq!(val["row_count"], 2);
    assert_eq!(val["total_rows"], 3);
    assert!(val["rows"].as_array().unwrap().iter().all(|r| r["Region"] == "North"));
    assert_eq!(val["aggregate"]["op"], "count");
    assert_eq!(val["aggregate"]["value"], json!(2));
}

#[test]
fn query_sort_desc_keeps_nulls_last() {
    let fx = Fixture::new();
    let csv = fx.file("sales.csv", SALES);

    let output = fx.run(&["query", path_str(&csv), "--as", "Revenue=number", "--sort", "Revenue", "--desc", "--json"]);
    let val = stdout_json(&output);
    let revenues: Vec<Value> = val["rows"].as_array().unwrap().iter().map(|r| r["Revenue"].clone()).collect();
    assert_eq!(revenues, vec![json!(100), json!(20), Value::Null]);
}

#[test]
fn query_unknown_column_is_usage_error() {
    let fx = Fixture::new();
    let csv = fx.file("sales.csv", SALES);
    let output = fx.run(&["query", path_str(&csv), "--sort", "Profit"]);
    assert_eq!(exit_code(&output), 2);
    assert!(String::from_utf8_lossy(&output.stderr).contains("columns: Region, Revenue"));
}

#[test]
fn query_exports_csv() {
    let fx = Fixture::new();
    let csv = fx.file("sales.csv", SALES);
    let out = fx.dir.path().join("north.csv");

    let output = fx.run(&[
        "query", path_str(&csv), "--as", "Revenue=number", "--filter", "Region", "--op", "equals", "--value", "north",
        "-o", path_str(&out),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "Region,Revenue\nNorth,100\nNorth,20\n");
}

// ---------------------------------------------------------------------------
// chart
// ---------------------------------------------------------------------------

#[test]
fn chart_grouped_count() {
    let fx = Fixture::new();
    let csv = fx.file("sales.csv", SALES);

    let output = fx.run(&["chart", path_str(&csv), "--as", "Revenue=number"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let val = stdout_json(&output);
    assert_eq!(val["data"], json!([{"Region": "North", "Revenue": 2}, {"Region": "South", "Revenue": 1}]));
    assert_eq!(val["chart"]["xAxis"], "Region");
    assert_eq!(val["chart"]["groupOp"], "count");
}

#[test]
fn chart_bins_numeric_x() {
    let fx = Fixture::new();
    let csv = fx.file("scores.csv", "Score,Points\n5,1\n12,2\n15,3\n29,4\n");

    let output = fx.run(&["chart", path_str(&csv), "--x", "Score", "--y", "Points", "--bin", "10", "--group-op", "sum"]);
    let val = stdout_json(&output);
    let labels: Vec<&str> = val["data"].as_array().unwrap().iter().map(|p| p["Score"].as_str().unwrap()).collect();
    assert_eq!(labels, vec!["0 - 10", "10 - 20", "20 - 30"]);
    let sums: Vec<&Value> = val["data"].as_array().unwrap().iter().map(|p| &p["Points"]).collect();
    assert_eq!(sums, vec![&json!(1), &json!(5), &json!(4)]);
}

#[test]
fn chart_without_numeric_column() {
    let fx = Fixture::new();
    let csv = fx.file("sales.csv", SALES);
    let output = fx.run(&["chart", path_str(&csv)]);
    assert_eq!(exit_code(&output), 6);
}

// ---------------------------------------------------------------------------
// paste
// ---------------------------------------------------------------------------

#[test]
fn paste_into_blank_grid() {
    let fx = Fixture::new();
    let output = fx.run_with_stdin(&["paste", "--json"], "a\tb\r\n1\t2\r\n");
    let val = stdout_json(&output);
    assert_eq!(val["columns"], json!(["A", "B", "C", "D", "E"]));
    assert_eq!(val["rows"].as_array().unwrap().len(), 20);
    assert_eq!(val["rows"][1], json!(["1", "2", "", "", ""]));
    assert_eq!(val["added_columns"], 0);
}

#[test]
fn paste_grows_grid() {
    let fx = Fixture::new();
    let output = fx.run_with_stdin(&["paste", "--row", "19", "--col", "4", "--json"], "x\ty\nz\n");
    let val = stdout_json(&output);
    assert_eq!(val["columns"].as_array().unwrap().len(), 6);
    assert_eq!(val["rows"].as_array().unwrap().len(), 21);
    assert_eq!(val["added_columns"], 1);
    assert_eq!(val["added_rows"], 1);
    assert_eq!(val["rows"][20][4], "z");
}

#[test]
fn paste_commit_drops_empty_rows() {
    let fx = Fixture::new();
    let output = fx.run_with_stdin(&["paste", "--commit", "--json"], "North\t100\nSouth\t\n");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let val = stdout_json(&output);
    let rows = val["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["A"], "North");
    assert_eq!(rows[0]["B"], "100");
}

#[test]
fn paste_commit_blank_grid_has_no_rows() {
    let fx = Fixture::new();
    let output = fx.run_with_stdin(&["paste", "--commit"], "");
    assert_eq!(exit_code(&output), 5);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Please add at least one row of data."));
}

#[test]
fn paste_onto_existing_file() {
    let fx = Fixture::new();
    let csv = fx.file("draft.csv", "Item,Qty\nPen,2\n");
    let output = fx.run_with_stdin(&["paste", "--grid", path_str(&csv), "--row", "1", "--json"], "Ink\t5\n");
    let val = stdout_json(&output);
    assert_eq!(val["columns"], json!(["Item", "Qty"]));
    assert_eq!(val["rows"], json!([["Pen", "2"], ["Ink", "5"]]));
}

// ---------------------------------------------------------------------------
// ask / chat / ai doctor (no network: disabled or unreachable endpoints)
// ---------------------------------------------------------------------------

const UNREACHABLE: &str =
    r#"{"ai": {"provider": "local", "endpoint": "http://127.0.0.1:9/v1/chat/completions", "timeout_secs": 2}}"#;

#[test]
fn doctor_disabled() {
    let fx = Fixture::new();
    let output = fx.run(&["ai", "doctor", "--json"]);
    assert_eq!(exit_code(&output), 10);
    let val = stdout_json(&output);
    assert_eq!(val["status"], "disabled");
    assert_eq!(val["provider"], "none");
}

#[test]
fn doctor_missing_key() {
    let fx = Fixture::new();
    fx.settings(r#"{"ai": {"provider": "groq"}}"#);
    let output = fx.run(&["ai", "doctor", "--json"]);
    assert_eq!(exit_code(&output), 11);
    let val = stdout_json(&output);
    assert_eq!(val["status"], "missing_key");
    assert_eq!(val["key_present"], false);
    assert_eq!(val["model"], "openai/gpt-oss-120b");
}

#[test]
fn doctor_ready_with_key_never_prints_it() {
    let fx = Fixture::new();
    fx.settings(r#"{"ai": {"provider": "groq"}}"#);
    let output = fx.dpk().args(["ai", "doctor", "--json"]).env("GROQ_API_KEY", "sk-secret-value").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("sk-secret-value"));
    assert_eq!(stdout_json(&output)["key_source"], "environment");
}

#[test]
fn ask_disabled_reports_failure_json() {
    let fx = Fixture::new();
    let csv = fx.file("sales.csv", SALES);
    let output = fx.run(&["ask", path_str(&csv), "Which region sold most?"]);
    assert_eq!(exit_code(&output), 10);
    let val = stdout_json(&output);
    assert_eq!(val["success"], false);
    assert!(val["error"].as_str().unwrap().contains("not configured"));
}

#[test]
fn ask_unreachable_endpoint_is_request_failure() {
    let fx = Fixture::new();
    fx.settings(UNREACHABLE);
    let csv = fx.file("sales.csv", SALES);
    let output = fx.run(&["ask", path_str(&csv), "Total revenue?"]);
    assert_eq!(exit_code(&output), 12);
    let val = stdout_json(&output);
    assert_eq!(val["success"], false);
    assert!(val["error"].as_str().unwrap().starts_with("Network error"));
}

#[test]
fn chat_failure_becomes_error_turn() {
    let fx = Fixture::new();
    fx.settings(UNREACHABLE);
    let csv = fx.file("sales.csv", SALES);
    let output = fx.run_with_stdin(&["chat", path_str(&csv), "--json"], "How many rows?\n   \n");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let val = stdout_json(&output);
    assert_eq!(
        val["messages"],
        json!([
            {"role": "user", "content": "How many rows?"},
            {"role": "assistant", "content": "Sorry, I encountered an error analyzing the data."}
        ])
    );
}
