use std::path::{Path, PathBuf};

use paddock_stage::link::LinkKind;
use paddock_stage::{run, StageConfig, Table};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn config(output_dir: &Path) -> StageConfig {
    let src = format!(
        r#"
input_dir = '{input}'
output_dir = '{output}'

[[table]]
input = "races.csv"
output = "races_staging.csv"
drop = ["time", "url"]
rename = {{ raceId = "race_id", circuitId = "circuit_id" }}
integer = ["year", "round"]
dedupe = true

[[table]]
input = "drivers.csv"
output = "drivers_staging.csv"
drop = ["url"]
rename = {{ driverId = "driver_id", driverRef = "driver_ref" }}
integer = ["number"]

[[table]]
input = "lap_times.csv"
output = "lap_times_staging.csv"
drop = ["milliseconds"]
rename = {{ raceId = "race_id", driverId = "driver_id", time = "lap_time_ms" }}
integer = ["lap", "position"]
duration_ms = ["lap_time_ms"]

[[table]]
input = "countries.csv"
output = "countries_staging.csv"

[[attach]]
column = "meeting_key"
source = {{ table = "races_staging.csv", key = "race_id", label = "name", scope = "year" }}
reference = {{ table = "meetings.csv", key = "meeting_key", label = "meeting_name", scope = "year" }}

[[junction]]
output = "driver_nationality_staging.csv"
columns = ["driver_id", "country_id"]
source = {{ table = "drivers_staging.csv", key = "driver_id", label = "nationality" }}
reference = {{ table = "countries_staging.csv", key = "country_id", label = "nationality" }}
"#,
        input = fixtures_dir().display(),
        output = output_dir.display(),
    );
    toml::from_str(&src).unwrap()
}

fn read_staged(dir: &Path, name: &str) -> Table {
    Table::read(&dir.join(name), "\\N").unwrap_or_else(|e| panic!("cannot read {name}: {e}"))
}

#[test]
fn stage_writes_every_table() {
    let out = tempfile::tempdir().unwrap();
    let report = run(&config(out.path()), Path::new(".")).unwrap();

    assert_eq!(
        report.written,
        vec![
            "countries_staging.csv",
            "driver_nationality_staging.csv",
            "drivers_staging.csv",
            "lap_times_staging.csv",
            "races_staging.csv",
        ]
    );
    for name in &report.written {
        assert!(out.path().join(name).exists(), "{name} not written");
    }
}

#[test]
fn races_gain_meeting_keys_within_year() {
    let out = tempfile::tempdir().unwrap();
    let report = run(&config(out.path()), Path::new(".")).unwrap();

    let races = read_staged(out.path(), "races_staging.csv");
    assert_eq!(
        races.headers,
        vec!["race_id", "year", "round", "circuit_id", "name", "date", "meeting_key"]
    );
    // duplicate Australian row removed
    assert_eq!(races.len(), 6);

    let key = races.column("meeting_key").unwrap();
    let linked: Vec<(Option<&str>, Option<&str>)> =
        (0..races.len()).map(|r| (races.value(r, 0), races.value(r, key))).collect();
    assert_eq!(
        linked,
        vec![
            (Some("1098"), Some("1141")),
            (Some("1099"), Some("1142")),
            (Some("1100"), Some("1143")),
            (Some("1119"), None),
            (Some("1120"), Some("1224")),
            (Some("1121"), Some("1229")),
        ]
    );

    let attach = report.links.iter().find(|l| l.kind == LinkKind::Attach).unwrap();
    assert_eq!(attach.matched, 5);
    assert_eq!(attach.unmatched, 1);
    assert_eq!(attach.tied, 0);
}

#[test]
fn nationalities_become_junction_rows() {
    let out = tempfile::tempdir().unwrap();
    let report = run(&config(out.path()), Path::new(".")).unwrap();

    let pairs = read_staged(out.path(), "driver_nationality_staging.csv");
    assert_eq!(pairs.headers, vec!["driver_id", "country_id"]);
    let rows: Vec<(&str, &str)> = (0..pairs.len())
        .map(|r| (pairs.value(r, 0).unwrap(), pairs.value(r, 1).unwrap()))
        .collect();
    assert_eq!(
        rows,
        vec![("1", "GBR"), ("830", "NLD"), ("815", "MEX"), ("9000", "GBR"), ("9000", "USA")]
    );

    let junction = report.links.iter().find(|l| l.kind == LinkKind::Junction).unwrap();
    assert_eq!(junction.rows, 6);
    assert_eq!(junction.matched, 4);
    assert_eq!(junction.unmatched, 2);
    assert_eq!(junction.emitted, 5);
}

#[test]
fn lap_times_converted_to_ms() {
    let out = tempfile::tempdir().unwrap();
    let report = run(&config(out.path()), Path::new(".")).unwrap();

    let content = std::fs::read_to_string(out.path().join("lap_times_staging.csv")).unwrap();
    assert_eq!(
        content,
        "race_id,driver_id,lap,position,lap_time_ms\n\
1098,830,1,1,97284\n\
1098,830,2,1,96387\n\
1098,1,1,5,99019\n\
1098,1,2,\\N,\\N\n"
    );

    let laps = report.tables.iter().find(|t| t.input == "lap_times.csv").unwrap();
    assert_eq!(laps.coerced_nulls.get("lap_time_ms"), Some(&1));
}

#[test]
fn accented_names_survive_staging() {
    let out = tempfile::tempdir().unwrap();
    run(&config(out.path()), Path::new(".")).unwrap();
    let drivers = read_staged(out.path(), "drivers_staging.csv");
    let surname = drivers.column("surname").unwrap();
    assert_eq!(drivers.value(2, surname), Some("Pérez"));
}

#[test]
fn missing_input_file_is_reported() {
    let out = tempfile::tempdir().unwrap();
    let mut config = config(out.path());
    config.tables[0].input = "circuits.csv".into();
    let err = run(&config, Path::new(".")).unwrap_err();
    assert!(err.to_string().contains("circuits.csv"), "{err}");
}
