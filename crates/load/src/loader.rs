use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::config::LoadConfig;
use crate::error::LoadError;
use crate::plan::{discover, PlannedLoad, TableRef};

#[derive(Debug, Clone, Serialize)]
pub struct TableLoad {
    pub file: String,
    pub target: String,
    pub rows: usize,
    pub truncated: bool,
    /// Table columns absent from the CSV header.
    pub missing_columns: Vec<String>,
    /// CSV columns the table does not have.
    pub extra_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub database: String,
    pub tables: Vec<TableLoad>,
}

impl LoadReport {
    pub fn rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn column_warnings(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| !t.missing_columns.is_empty() || !t.extra_columns.is_empty())
            .count()
    }
}

/// Open the database, attach extra schemas and enable foreign keys.
pub fn open(config: &LoadConfig) -> Result<Connection, LoadError> {
    let conn = Connection::open(&config.database).map_err(|e| {
        LoadError::Sqlite(format!("cannot open {}: {e}", config.database.display()))
    })?;
    for (name, path) in &config.attach {
        conn.execute(
            &format!("ATTACH DATABASE ?1 AS {}", quote_ident(name)),
            [path.display().to_string()],
        )
        .map_err(|e| LoadError::Sqlite(format!("cannot attach {name} ({}): {e}", path.display())))?;
        log::debug!("attached {} as {name}", path.display());
    }
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Discover staged files in `csv_dir` and load them into the configured database.
pub fn load(config: &LoadConfig, csv_dir: &Path) -> Result<LoadReport, LoadError> {
    config.validate()?;
    let planned = discover(csv_dir, config)?;
    let mut conn = open(config)?;
    let tables = load_into(&mut conn, &planned, config)?;
    Ok(LoadReport {
        database: config.database.display().to_string(),
        tables,
    })
}

/// Load `planned` files in order inside one transaction.
///
/// Foreign keys are checked at commit; any error rolls everything back.
pub fn load_into(
    conn: &mut Connection,
    planned: &[PlannedLoad],
    config: &LoadConfig,
) -> Result<Vec<TableLoad>, LoadError> {
    let tx = conn.transaction()?;
    tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;

    let mut loaded = Vec::with_capacity(planned.len());
    for item in planned {
        log::info!("loading {} -> {}", item.file_name(), item.target);
        if !table_exists(&tx, &item.target)? {
            return Err(LoadError::MissingTable {
                schema: item.target.schema.clone(),
                table: item.target.table.clone(),
            });
        }
        let table_load = load_file(&tx, item, config).map_err(|e| LoadError::Failed {
            file: item.file.display().to_string(),
            target: item.target.to_string(),
            message: e.to_string(),
        })?;
        log::info!("{}: {} rows", item.target, table_load.rows);
        loaded.push(table_load);
    }

    tx.commit()
        .map_err(|e| LoadError::Sqlite(format!("commit failed: {e}")))?;
    Ok(loaded)
}

fn load_file(conn: &Connection, item: &PlannedLoad, config: &LoadConfig) -> Result<TableLoad, LoadError> {
    let target = &item.target;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(&item.file)
        .map_err(|e| csv_error(&item.file, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(&item.file, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(LoadError::Io {
            path: item.file.display().to_string(),
            message: "no header row".into(),
        });
    }

    let columns = table_columns(conn, target)?;
    let csv_cols: BTreeSet<&str> = headers.iter().map(String::as_str).collect();
    let table_cols: BTreeSet<&str> = columns.iter().map(String::as_str).collect();
    let missing: Vec<String> = table_cols.difference(&csv_cols).map(|c| c.to_string()).collect();
    let extra: Vec<String> = csv_cols.difference(&table_cols).map(|c| c.to_string()).collect();
    if !missing.is_empty() {
        log::warn!("{target}: columns missing from {}: {}", item.file_name(), missing.join(", "));
    }
    if !extra.is_empty() {
        log::warn!("{target}: extra columns in {}: {}", item.file_name(), extra.join(", "));
    }

    let truncated = config.truncate_before_load;
    if truncated {
        truncate(conn, target)?;
    }

    let column_list: Vec<String> = headers.iter().map(|h| quote_ident(h)).collect();
    let placeholders: Vec<String> = (1..=headers.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified(target),
        column_list.join(", "),
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;

    let mut rows = 0;
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(&item.file, e))?;
        let values = record.iter().map(|v| {
            if v.is_empty() || v == config.null_token {
                None
            } else {
                Some(v)
            }
        });
        stmt.execute(rusqlite::params_from_iter(values))?;
        rows += 1;
    }

    Ok(TableLoad {
        file: item.file_name(),
        target: target.to_string(),
        rows,
        truncated,
        missing_columns: missing,
        extra_columns: extra,
    })
}

fn table_exists(conn: &Connection, target: &TableRef) -> Result<bool, LoadError> {
    if !schema_names(conn)?.iter().any(|s| s == &target.schema) {
        return Ok(false);
    }
    let sql = format!(
        "SELECT 1 FROM {}.sqlite_master WHERE type = 'table' AND name = ?1",
        quote_ident(&target.schema)
    );
    let found: Option<i64> = conn
        .query_row(&sql, [&target.table], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn schema_names(conn: &Connection) -> Result<Vec<String>, LoadError> {
    let mut stmt = conn.prepare("PRAGMA database_list")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn table_columns(conn: &Connection, target: &TableRef) -> Result<Vec<String>, LoadError> {
    let sql = format!(
        "PRAGMA {}.table_info({})",
        quote_ident(&target.schema),
        quote_ident(&target.table)
    );
    let mut stmt = conn.prepare(&sql)?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Delete all rows and reset the table's autoincrement counter.
fn truncate(conn: &Connection, target: &TableRef) -> Result<(), LoadError> {
    let deleted = conn.execute(&format!("DELETE FROM {}", qualified(target)), [])?;
    let schema = quote_ident(&target.schema);
    let has_sequence: Option<i64> = conn
        .query_row(
            &format!("SELECT 1 FROM {schema}.sqlite_master WHERE name = 'sqlite_sequence'"),
            [],
            |row| row.get(0),
        )
        .optional()?;
    if has_sequence.is_some() {
        conn.execute(
            &format!("DELETE FROM {schema}.sqlite_sequence WHERE name = ?1"),
            [&target.table],
        )?;
    }
    log::debug!("truncated {target} ({deleted} rows)");
    Ok(())
}

fn qualified(target: &TableRef) -> String {
    format!("{}.{}", quote_ident(&target.schema), quote_ident(&target.table))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn csv_error(path: &Path, e: csv::Error) -> LoadError {
    LoadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
