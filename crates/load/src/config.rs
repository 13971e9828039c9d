use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::LoadError;

/// Parent tables first so deferred foreign keys resolve cheaply at commit.
pub const DEFAULT_LOAD_ORDER: &[&str] = &[
    "countries",
    "drivers",
    "driver_nationality",
    "constructors",
    "constructor_nationality",
    "circuits",
    "seasons",
    "races",
    "constructors_standings",
    "constructors_results",
    "status",
    "drivers_standings",
    "lap_times",
    "pit_stops",
    "qualifying",
    "race_results",
    "sprint_results",
    "sessions",
    "weather",
    "race_lineup",
    "speed",
    "stints",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    /// SQLite database file.
    pub database: PathBuf,
    /// Directory of staged CSVs. When absent the caller supplies one.
    #[serde(default)]
    pub csv_dir: Option<PathBuf>,
    #[serde(default = "default_schema")]
    pub default_schema: String,
    #[serde(default = "default_true")]
    pub truncate_before_load: bool,
    /// Stripped from table names parsed out of file names. Empty disables.
    #[serde(default = "default_strip_suffix")]
    pub strip_suffix: String,
    /// Overrides the schema parsed from every file name.
    #[serde(default)]
    pub force_schema: Option<String>,
    #[serde(default = "default_null_token")]
    pub null_token: String,
    #[serde(default = "default_load_order")]
    pub load_order: Vec<String>,
    /// Extra schemas: name -> database file, attached before loading.
    #[serde(default)]
    pub attach: BTreeMap<String, PathBuf>,
}

fn default_schema() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

fn default_strip_suffix() -> String {
    "_staging".to_string()
}

fn default_null_token() -> String {
    "\\N".to_string()
}

fn default_load_order() -> Vec<String> {
    DEFAULT_LOAD_ORDER.iter().map(|s| s.to_string()).collect()
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("paddock.db"),
            csv_dir: None,
            default_schema: default_schema(),
            truncate_before_load: true,
            strip_suffix: default_strip_suffix(),
            force_schema: None,
            null_token: default_null_token(),
            load_order: default_load_order(),
            attach: BTreeMap::new(),
        }
    }
}

impl LoadConfig {
    pub fn validate(&self) -> Result<(), LoadError> {
        let invalid = |msg: String| Err(LoadError::Config(msg));

        if self.database.as_os_str().is_empty() {
            return invalid("database must not be empty".into());
        }
        if self.default_schema.trim().is_empty() {
            return invalid("default_schema must not be empty".into());
        }
        if let Some(ref schema) = self.force_schema {
            if schema.trim().is_empty() {
                return invalid("force_schema must not be empty when set".into());
            }
        }
        if self.null_token.is_empty() {
            return invalid("null_token must not be empty".into());
        }
        for name in self.attach.keys() {
            if name.trim().is_empty() || name == "main" || name == "temp" {
                return invalid(format!("attach: '{name}' is not a usable schema name"));
            }
        }
        Ok(())
    }

    /// Resolve relative paths against `base_dir` (the config file's directory).
    pub fn with_base_dir(&self, base_dir: &Path) -> LoadConfig {
        let mut resolved = self.clone();
        resolved.database = base_dir.join(&self.database);
        resolved.csv_dir = self.csv_dir.as_ref().map(|dir| base_dir.join(dir));
        resolved.attach = self
            .attach
            .iter()
            .map(|(name, path)| (name.clone(), base_dir.join(path)))
            .collect();
        resolved
    }

    /// Position of `table` in the load order; unknown tables sort last.
    pub fn order_of(&self, table: &str) -> usize {
        self.load_order
            .iter()
            .position(|t| t == table)
            .unwrap_or(self.load_order.len())
    }
}
