use std::fmt;

use paddock_resolve::ResolveError;

#[derive(Debug)]
pub enum StageError {
    /// Config validation error (bad threshold, clashing outputs, etc.).
    Config(String),
    /// File could not be read or written.
    Io { path: String, message: String },
    /// Malformed CSV content.
    Csv { path: String, message: String },
    /// A step or pass names a column the table does not have.
    MissingColumn { table: String, column: String },
    /// A pass would add a column the table already has.
    DuplicateColumn { table: String, column: String },
    /// A reference table failed its pool integrity check.
    Pool { table: String, source: ResolveError },
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "stage config error: {msg}"),
            Self::Io { path, message } => write!(f, "{path}: {message}"),
            Self::Csv { path, message } => write!(f, "{path}: malformed CSV: {message}"),
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::DuplicateColumn { table, column } => {
                write!(f, "table '{table}': column '{column}' already exists")
            }
            Self::Pool { table, source } => write!(f, "reference table '{table}': {source}"),
        }
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pool { source, .. } => Some(source),
            _ => None,
        }
    }
}
