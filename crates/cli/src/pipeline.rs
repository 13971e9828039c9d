//! `paddock transform | load | run | validate`: config-driven pipeline commands.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use paddock_load::{LoadReport, PlannedLoad};
use paddock_stage::StageReport;
use serde::Serialize;

use crate::config::{read_config, PipelineConfig};
use crate::exit_codes::{load_exit_code, stage_exit_code, EXIT_IO};
use crate::CliError;

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    started_at: DateTime<Utc>,
    duration_ms: u64,
    stage: StageReport,
    load: LoadReport,
}

pub fn cmd_transform(config_path: PathBuf, json: bool, output: Option<PathBuf>) -> Result<(), CliError> {
    let (config, base_dir) = read_config(&config_path)?;
    let report = run_stage(&config, &base_dir)?;
    emit(&report, json, output.as_deref())?;
    print_stage_summary(&report);
    Ok(())
}

pub fn cmd_load(config_path: PathBuf, plan: bool, json: bool) -> Result<(), CliError> {
    let (config, base_dir) = read_config(&config_path)?;
    let (load, csv_dir) = config.load(&base_dir)?;

    if plan {
        let planned = paddock_load::discover(&csv_dir, &load)
            .map_err(|e| CliError::new(load_exit_code(&e), e.to_string()))?;
        if json {
            emit(&planned, true, None)?;
        } else {
            print_plan(&planned);
        }
        return Ok(());
    }

    let report = paddock_load::load(&load, &csv_dir)
        .map_err(|e| CliError::new(load_exit_code(&e), e.to_string()))?;
    emit(&report, json, None)?;
    print_load_summary(&report);
    Ok(())
}

pub fn cmd_run(config_path: PathBuf, json: bool) -> Result<(), CliError> {
    let (config, base_dir) = read_config(&config_path)?;
    // fail on a missing [load] before the stage writes anything
    let (load, csv_dir) = config.load(&base_dir)?;

    let started_at = Utc::now();
    let start = Instant::now();

    let stage = run_stage(&config, &base_dir)?;
    print_stage_summary(&stage);

    let load = paddock_load::load(&load, &csv_dir)
        .map_err(|e| CliError::new(load_exit_code(&e), e.to_string()))?;
    print_load_summary(&load);

    let report = RunReport {
        name: config.name.as_deref(),
        started_at,
        duration_ms: duration_ms(start.elapsed()),
        stage,
        load,
    };
    emit(&report, json, None)?;
    eprintln!("done in {}ms", report.duration_ms);
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, base_dir) = read_config(&config_path)?;

    if let Some(ref stage) = config.stage {
        eprintln!(
            "stage: {} tables, {} attach, {} junction -> {}",
            stage.tables.len(),
            stage.attach.len(),
            stage.junction.len(),
            base_dir.join(&stage.output_dir).display(),
        );
    }
    if config.load.is_some() {
        let (load, csv_dir) = config.load(&base_dir)?;
        eprintln!(
            "load: {} -> {} ({} attached schemas)",
            csv_dir.display(),
            load.database.display(),
            load.attach.len(),
        );
    }
    eprintln!("{}: ok", config_path.display());
    Ok(())
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn run_stage(config: &PipelineConfig, base_dir: &Path) -> Result<StageReport, CliError> {
    paddock_stage::run(config.stage()?, base_dir)
        .map_err(|e| CliError::new(stage_exit_code(&e), e.to_string()))
}

/// JSON to stdout when asked, and to `output` when given.
fn emit<T: Serialize>(value: &T, json: bool, output: Option<&Path>) -> Result<(), CliError> {
    if !json && output.is_none() {
        return Ok(());
    }
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(EXIT_IO, format!("JSON serialization error: {e}")))?;
    if let Some(path) = output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_IO, format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }
    if json {
        println!("{json_str}");
    }
    Ok(())
}

fn print_stage_summary(report: &StageReport) {
    let rows: usize = report.tables.iter().map(|t| t.rows_out).sum();
    eprintln!(
        "stage: {} tables ({} rows), {} link passes: {} matched, {} unmatched -> {}",
        report.written.len(),
        rows,
        report.links.len(),
        report.matched(),
        report.unmatched(),
        report.output_dir,
    );
    for link in report.links.iter().filter(|l| l.tied > 0) {
        eprintln!("  {} -> {}: {} matches decided by a tie", link.source, link.reference, link.tied);
    }
}

fn print_load_summary(report: &LoadReport) {
    eprintln!(
        "load: {} tables, {} rows into {}",
        report.tables.len(),
        report.rows(),
        report.database,
    );
    for table in &report.tables {
        if !table.missing_columns.is_empty() {
            eprintln!("  {}: not in CSV: {}", table.target, table.missing_columns.join(", "));
        }
        if !table.extra_columns.is_empty() {
            eprintln!("  {}: not in table: {}", table.target, table.extra_columns.join(", "));
        }
    }
}

fn print_plan(planned: &[PlannedLoad]) {
    for (i, item) in planned.iter().enumerate() {
        println!("{:>3}  {}  ->  {}", i + 1, item.file_name(), item.target);
    }
}
