use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::StageConfig;
use crate::error::StageError;
use crate::link::{attach, junction, LinkStats};
use crate::steps::{apply_steps, TableStats};
use crate::table::Table;

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// Staged tables held in memory until the stage finishes.
///
/// Lookups by name check staged tables first, then fall back to reading the
/// raw extract from the input directory.
pub struct Workspace {
    input_dir: PathBuf,
    null_token: String,
    staged: BTreeMap<String, Table>,
}

impl Workspace {
    pub fn new(input_dir: impl Into<PathBuf>, null_token: impl Into<String>) -> Self {
        Self {
            input_dir: input_dir.into(),
            null_token: null_token.into(),
            staged: BTreeMap::new(),
        }
    }

    pub fn table(&self, name: &str) -> Result<Cow<'_, Table>, StageError> {
        match self.staged.get(name) {
            Some(table) => Ok(Cow::Borrowed(table)),
            None => Ok(Cow::Owned(self.read_input(name)?)),
        }
    }

    pub fn read_input(&self, name: &str) -> Result<Table, StageError> {
        Table::read(&self.input_dir.join(name), &self.null_token)
    }

    pub fn stage(&mut self, name: &str, table: Table) {
        self.staged.insert(name.to_string(), table);
    }

    /// Write every staged table into `output_dir`, returning the file names.
    pub fn write_all(&self, output_dir: &Path) -> Result<Vec<String>, StageError> {
        std::fs::create_dir_all(output_dir).map_err(|e| StageError::Io {
            path: output_dir.display().to_string(),
            message: e.to_string(),
        })?;

        let mut written = Vec::with_capacity(self.staged.len());
        for (name, table) in &self.staged {
            table.write(&output_dir.join(name), &self.null_token)?;
            log::info!("wrote {name} ({} rows)", table.len());
            written.push(name.clone());
        }
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub output_dir: String,
    pub tables: Vec<TableStats>,
    pub links: Vec<LinkStats>,
    pub written: Vec<String>,
}

impl StageReport {
    pub fn matched(&self) -> usize {
        self.links.iter().map(|l| l.matched).sum()
    }

    pub fn unmatched(&self) -> usize {
        self.links.iter().map(|l| l.unmatched).sum()
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run the stage: table steps, attach passes, junction passes, then write.
///
/// Relative directories in `config` resolve against `base_dir`.
pub fn run(config: &StageConfig, base_dir: &Path) -> Result<StageReport, StageError> {
    config.validate()?;

    let input_dir = base_dir.join(&config.input_dir);
    let output_dir = base_dir.join(&config.output_dir);
    let mut workspace = Workspace::new(&input_dir, config.null_token.clone());

    let mut tables = Vec::with_capacity(config.tables.len());
    for spec in &config.tables {
        let raw = workspace.read_input(&spec.input)?;
        let (staged, stats) = apply_steps(raw, spec)?;
        log::info!("{} -> {}: {} rows in, {} rows out", spec.input, spec.output, stats.rows_in, stats.rows_out);
        workspace.stage(&spec.output, staged);
        tables.push(stats);
    }

    let mut links = Vec::with_capacity(config.attach.len() + config.junction.len());
    for spec in &config.attach {
        let (linked, stats) = {
            let source = workspace.table(&spec.source.table)?;
            let reference = workspace.table(&spec.reference.table)?;
            attach(&source, &reference, spec)?
        };
        workspace.stage(spec.output_name(), linked);
        links.push(stats);
    }
    for spec in &config.junction {
        let (pairs, stats) = {
            let source = workspace.table(&spec.source.table)?;
            let reference = workspace.table(&spec.reference.table)?;
            junction(&source, &reference, spec)?
        };
        workspace.stage(&spec.output, pairs);
        links.push(stats);
    }

    let written = workspace.write_all(&output_dir)?;

    Ok(StageReport {
        output_dir: output_dir.display().to_string(),
        tables,
        links,
        written,
    })
}
