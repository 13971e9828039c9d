use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::LoadConfig;
use crate::error::LoadError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// One staged file and the table it loads into.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedLoad {
    #[serde(serialize_with = "serialize_path")]
    pub file: PathBuf,
    pub target: TableRef,
}

fn serialize_path<S: serde::Serializer>(path: &Path, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&path.display().to_string())
}

impl PlannedLoad {
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.display().to_string())
    }
}

/// Map a staged file name to its target table.
///
/// `drivers_staging.csv` → `(default_schema, drivers)`;
/// `rdl.sessions.csv` → `(rdl, sessions)`. Anything with more dots is rejected.
pub fn parse_table_from_filename(path: &Path, config: &LoadConfig) -> Result<TableRef, LoadError> {
    let bad = || LoadError::BadFileName(path.display().to_string());
    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(".csv"))
        .ok_or_else(bad)?;

    let parts: Vec<&str> = stem.split('.').collect();
    let (schema, table) = match parts.as_slice() {
        [table] => (config.default_schema.as_str(), *table),
        [schema, table] => (*schema, *table),
        _ => return Err(bad()),
    };

    let table = if config.strip_suffix.is_empty() {
        table
    } else {
        table.strip_suffix(config.strip_suffix.as_str()).unwrap_or(table)
    };
    if schema.is_empty() || table.is_empty() {
        return Err(bad());
    }

    let schema = config.force_schema.as_deref().unwrap_or(schema);
    Ok(TableRef {
        schema: schema.to_string(),
        table: table.to_string(),
    })
}

/// Find every `*.csv` in `csv_dir` and order it for loading.
///
/// Files are sorted by name, then stably by the table's position in the
/// load order; tables outside the order keep their name order at the end.
pub fn discover(csv_dir: &Path, config: &LoadConfig) -> Result<Vec<PlannedLoad>, LoadError> {
    let pattern = format!("{}/*.csv", glob::Pattern::escape(&csv_dir.display().to_string()));
    let entries = glob::glob(&pattern).map_err(|e| LoadError::Io {
        path: csv_dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| LoadError::Io {
            path: e.path().display().to_string(),
            message: e.error().to_string(),
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(LoadError::NoFiles(csv_dir.display().to_string()));
    }
    files.sort();

    let mut planned = files
        .into_iter()
        .map(|file| {
            let target = parse_table_from_filename(&file, config)?;
            Ok(PlannedLoad { file, target })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;
    planned.sort_by_key(|p| config.order_of(&p.target.table));

    log::info!("planned {} files from {}", planned.len(), csv_dir.display());
    Ok(planned)
}
