use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coerce::{lap_time_to_ms, to_float, to_integer};
use crate::error::StageError;
use crate::table::Table;

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Column steps for one raw extract. Steps run in field order:
/// drop, rename, integer, float, duration_ms, select, dedupe.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    /// File name in the input directory.
    pub input: String,
    /// File name in the output directory.
    pub output: String,
    #[serde(default)]
    pub drop: Vec<String>,
    /// Old name -> new name.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    #[serde(default)]
    pub integer: Vec<String>,
    #[serde(default)]
    pub float: Vec<String>,
    /// Lap-time columns (`m:ss.mmm`) rewritten as integer milliseconds.
    #[serde(default)]
    pub duration_ms: Vec<String>,
    #[serde(default)]
    pub select: Option<Vec<String>>,
    #[serde(default)]
    pub dedupe: bool,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableStats {
    pub input: String,
    pub output: String,
    pub rows_in: usize,
    pub rows_out: usize,
    /// Per column: values that failed coercion and became null.
    pub coerced_nulls: BTreeMap<String, usize>,
    pub duplicates_removed: usize,
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

pub fn apply_steps(mut table: Table, spec: &TableSpec) -> Result<(Table, TableStats), StageError> {
    let mut stats = TableStats {
        input: spec.input.clone(),
        output: spec.output.clone(),
        rows_in: table.len(),
        ..TableStats::default()
    };

    for column in &spec.drop {
        table.drop_column(column)?;
    }
    for (from, to) in &spec.rename {
        table.rename_column(from, to)?;
    }

    for column in &spec.integer {
        let nulled = table.map_column(column, to_integer)?;
        record_nulls(&mut stats, &table.name, column, nulled);
    }
    for column in &spec.float {
        let nulled = table.map_column(column, to_float)?;
        record_nulls(&mut stats, &table.name, column, nulled);
    }
    for column in &spec.duration_ms {
        let nulled = table.map_column(column, |v| lap_time_to_ms(v).map(|ms| ms.to_string()))?;
        record_nulls(&mut stats, &table.name, column, nulled);
    }

    if let Some(ref columns) = spec.select {
        table.select(columns)?;
    }
    if spec.dedupe {
        stats.duplicates_removed = table.dedupe();
    }

    table.name = spec.output.clone();
    stats.rows_out = table.len();
    Ok((table, stats))
}

fn record_nulls(stats: &mut TableStats, table: &str, column: &str, nulled: usize) {
    if nulled > 0 {
        log::warn!("{table}: {nulled} value(s) in '{column}' could not be coerced and were set to null");
        *stats.coerced_nulls.entry(column.to_string()).or_insert(0) += nulled;
    }
}
