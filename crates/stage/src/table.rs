// In-memory CSV table with nullable cells.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::error::StageError;

pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Source file name, used in error messages.
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

// ---------------------------------------------------------------------------
// Read / write
// ---------------------------------------------------------------------------

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self { name: name.into(), headers, rows: Vec::new() }
    }

    /// Read a CSV file with a header row. Cells equal to `null_token`, and
    /// empty cells, become null.
    pub fn read(path: &Path, null_token: &str) -> Result<Self, StageError> {
        let content = read_file_as_utf8(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_csv_str(&name, &content, null_token)
    }

    pub fn from_csv_str(name: &str, content: &str, null_token: &str) -> Result<Self, StageError> {
        let csv_err = |e: csv::Error| StageError::Csv { path: name.to_string(), message: e.to_string() };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            rows.push(record.iter().map(|field| read_cell(field, null_token)).collect());
        }

        Ok(Self { name: name.to_string(), headers, rows })
    }

    /// Serialize as CSV, writing nulls as `null_token`.
    pub fn to_csv_string(&self, null_token: &str) -> Result<String, StageError> {
        let csv_err = |e: csv::Error| StageError::Csv { path: self.name.clone(), message: e.to_string() };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers).map_err(csv_err)?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or(null_token)))
                .map_err(csv_err)?;
        }
        let bytes = writer.into_inner().map_err(|e| StageError::Csv {
            path: self.name.clone(),
            message: e.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|e| StageError::Csv {
            path: self.name.clone(),
            message: e.to_string(),
        })
    }

    pub fn write(&self, path: &Path, null_token: &str) -> Result<(), StageError> {
        let content = self.to_csv_string(null_token)?;
        std::fs::write(path, content).map_err(|e| StageError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

fn read_cell(field: &str, null_token: &str) -> Cell {
    if field.is_empty() || field == null_token {
        None
    } else {
        Some(field.to_string())
    }
}

/// Read file and convert to UTF-8 if needed (raw extracts are sometimes
/// saved as Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, StageError> {
    let io_err = |e: std::io::Error| StageError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

// ---------------------------------------------------------------------------
// Column access
// ---------------------------------------------------------------------------

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require(&self, name: &str) -> Result<usize, StageError> {
        self.column(name).ok_or_else(|| StageError::MissingColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Cell value, `None` for nulls and out-of-range indexes.
    pub fn value(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    pub fn push_column(&mut self, name: &str, values: Vec<Cell>) -> Result<(), StageError> {
        if self.column(name).is_some() {
            return Err(StageError::DuplicateColumn {
                table: self.name.clone(),
                column: name.to_string(),
            });
        }
        self.headers.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<(), StageError> {
        let idx = self.require(name)?;
        self.headers.remove(idx);
        for row in &mut self.rows {
            if idx < row.len() {
                row.remove(idx);
            }
        }
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), StageError> {
        let idx = self.require(from)?;
        if from != to && self.column(to).is_some() {
            return Err(StageError::DuplicateColumn {
                table: self.name.clone(),
                column: to.to_string(),
            });
        }
        self.headers[idx] = to.to_string();
        Ok(())
    }

    /// Keep only `columns`, in that order.
    pub fn select(&mut self, columns: &[String]) -> Result<(), StageError> {
        let indexes = columns
            .iter()
            .map(|c| self.require(c))
            .collect::<Result<Vec<_>, _>>()?;
        self.headers = columns.to_vec();
        for row in &mut self.rows {
            *row = indexes.iter().map(|&i| row.get(i).cloned().flatten()).collect();
        }
        Ok(())
    }

    /// Rewrite every cell of a column. Returns how many non-null cells the
    /// mapping turned into nulls.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<usize, StageError>
    where
        F: FnMut(&str) -> Cell,
    {
        let idx = self.require(name)?;
        let mut nulled = 0;
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(idx) {
                if let Some(value) = cell.take() {
                    *cell = f(&value);
                    if cell.is_none() {
                        nulled += 1;
                    }
                }
            }
        }
        Ok(nulled)
    }

    /// Remove exact duplicate rows, keeping the first occurrence. Returns the
    /// number of rows removed.
    pub fn dedupe(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<Vec<Cell>> = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }
}
