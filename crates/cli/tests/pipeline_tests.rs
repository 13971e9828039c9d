// End-to-end tests for `paddock transform | load | run | validate`.
//
// Each test writes a paddock.toml into a temp dir that reads raw extracts
// from tests/fixtures/raw and stages/loads into the temp dir.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rusqlite::Connection;

fn paddock() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_paddock"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

const CONFIG: &str = r#"
name = "f1 fixtures"

[stage]
input_dir = '{raw}'
output_dir = "staging"

[[stage.table]]
input = "races.csv"
output = "races_staging.csv"
drop = ["time", "url"]
rename = { raceId = "race_id", circuitId = "circuit_id" }
integer = ["year", "round"]
dedupe = true

[[stage.table]]
input = "drivers.csv"
output = "drivers_staging.csv"
drop = ["url"]
rename = { driverId = "driver_id", driverRef = "driver_ref" }
integer = ["number"]

[[stage.table]]
input = "countries.csv"
output = "countries_staging.csv"

[[stage.attach]]
column = "meeting_key"
source = { table = "races_staging.csv", key = "race_id", label = "name", scope = "year" }
reference = { table = "meetings.csv", key = "meeting_key", label = "meeting_name", scope = "year" }

[[stage.junction]]
output = "driver_nationality_staging.csv"
columns = ["driver_id", "country_id"]
source = { table = "drivers_staging.csv", key = "driver_id", label = "nationality" }
reference = { table = "countries_staging.csv", key = "country_id", label = "nationality" }

[load]
database = "paddock.db"
"#;

/// Temp workspace with a config and an empty database holding the schema.
fn workspace(config: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let raw = fixtures().join("raw");
    let src = config.replace("{raw}", &raw.display().to_string());
    let path = dir.path().join("paddock.toml");
    std::fs::write(&path, src).unwrap();

    let schema = std::fs::read_to_string(fixtures().join("schema.sql")).unwrap();
    Connection::open(dir.path().join("paddock.db"))
        .unwrap()
        .execute_batch(&schema)
        .unwrap();
    (dir, path)
}

fn run(args: &[&str], config: &Path) -> Output {
    paddock()
        .args(args)
        .arg(config)
        .output()
        .expect("spawn paddock")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn validate_ok() {
    let (_dir, config) = workspace(CONFIG);
    let output = run(&["validate"], &config);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("3 tables, 1 attach, 1 junction"), "{err}");
    assert!(err.contains(": ok"), "{err}");
}

#[test]
fn validate_rejects_bad_threshold() {
    let bad = CONFIG.replace(
        "column = \"meeting_key\"",
        "column = \"meeting_key\"\nthreshold = 170",
    );
    let (_dir, config) = workspace(&bad);
    let output = run(&["validate"], &config);
    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("between 0 and 100"));
}

#[test]
fn missing_config_is_io_error() {
    let output = paddock().args(["validate", "does/not/exist.toml"]).output().unwrap();
    assert_eq!(output.status.code(), Some(6));
    assert!(stderr(&output).starts_with("error: cannot read"));
}

#[test]
fn transform_json_report() {
    let (dir, config) = workspace(CONFIG);
    let output = run(&["transform", "--json"], &config);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let written: Vec<&str> = report["written"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(
        written,
        vec![
            "countries_staging.csv",
            "driver_nationality_staging.csv",
            "drivers_staging.csv",
            "races_staging.csv",
        ]
    );
    assert_eq!(report["links"][0]["kind"], "attach");
    assert_eq!(report["links"][0]["matched"], 5);
    assert!(dir.path().join("staging/races_staging.csv").exists());
}

#[test]
fn transform_output_file() {
    let (dir, config) = workspace(CONFIG);
    let report_path = dir.path().join("stage-report.json");
    let output = paddock()
        .arg("transform")
        .arg(&config)
        .arg("--output")
        .arg(&report_path)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(output.stdout.is_empty());
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["tables"].as_array().unwrap().len(), 3);
}

#[test]
fn load_plan_lists_dependency_order() {
    let (_dir, config) = workspace(CONFIG);
    assert!(run(&["transform"], &config).status.success());

    let output = run(&["load", "--plan"], &config);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let targets: Vec<&str> = stdout
        .lines()
        .map(|line| line.rsplit("->").next().unwrap().trim())
        .collect();
    assert_eq!(
        targets,
        vec!["main.countries", "main.drivers", "main.driver_nationality", "main.races"]
    );
}

#[test]
fn load_without_staged_files_fails() {
    let (_dir, config) = workspace(CONFIG);
    let output = run(&["load"], &config);
    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("no CSVs found"));
}

#[test]
fn run_stages_and_loads() {
    let (dir, config) = workspace(CONFIG);
    let output = run(&["run", "--json"], &config);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["name"], "f1 fixtures");
    assert!(report["started_at"].is_string());
    assert_eq!(report["load"]["tables"].as_array().unwrap().len(), 4);

    let conn = Connection::open(dir.path().join("paddock.db")).unwrap();
    let meeting: Option<i64> = conn
        .query_row("SELECT meeting_key FROM races WHERE race_id = 1120", [], |r| r.get(0))
        .unwrap();
    assert_eq!(meeting, Some(1224));
    let vegas: Option<i64> = conn
        .query_row("SELECT meeting_key FROM races WHERE race_id = 1119", [], |r| r.get(0))
        .unwrap();
    assert_eq!(vegas, None);
    let pairs: i64 = conn
        .query_row("SELECT COUNT(*) FROM driver_nationality", [], |r| r.get(0))
        .unwrap();
    assert_eq!(pairs, 5);
}

#[test]
fn run_twice_is_idempotent() {
    let (dir, config) = workspace(CONFIG);
    assert!(run(&["run"], &config).status.success());
    let output = run(&["run"], &config);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let conn = Connection::open(dir.path().join("paddock.db")).unwrap();
    let races: i64 = conn.query_row("SELECT COUNT(*) FROM races", [], |r| r.get(0)).unwrap();
    assert_eq!(races, 6);
}

#[test]
fn missing_target_table_fails_load() {
    let (dir, config) = workspace(CONFIG);
    Connection::open(dir.path().join("paddock.db"))
        .unwrap()
        .execute_batch("DROP TABLE races;")
        .unwrap();

    let output = run(&["run"], &config);
    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("main.races does not exist"));

    let conn = Connection::open(dir.path().join("paddock.db")).unwrap();
    let drivers: i64 = conn.query_row("SELECT COUNT(*) FROM drivers", [], |r| r.get(0)).unwrap();
    assert_eq!(drivers, 0);
}

#[test]
fn stage_failure_exit_code() {
    let bad = CONFIG.replace("integer = [\"number\"]", "integer = [\"car_number\"]");
    let (_dir, config) = workspace(&bad);
    let output = run(&["transform"], &config);
    assert_eq!(output.status.code(), Some(4), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("car_number"));
}
