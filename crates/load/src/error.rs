use std::fmt;

#[derive(Debug)]
pub enum LoadError {
    /// Config validation error.
    Config(String),
    /// The staging directory holds no CSV files.
    NoFiles(String),
    /// A file name does not map to `table` or `schema.table`.
    BadFileName(String),
    /// The target table does not exist. Always fatal.
    MissingTable { schema: String, table: String },
    /// Database open/attach/commit failure.
    Sqlite(String),
    /// A single file failed to load.
    Failed { file: String, target: String, message: String },
    Io { path: String, message: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "load config error: {msg}"),
            Self::NoFiles(dir) => write!(f, "no CSVs found in {dir}"),
            Self::BadFileName(name) => write!(f, "unexpected filename format: {name}"),
            Self::MissingTable { schema, table } => {
                write!(f, "target table {schema}.{table} does not exist")
            }
            Self::Sqlite(msg) => write!(f, "database error: {msg}"),
            Self::Failed { file, target, message } => {
                write!(f, "failed loading {file} into {target}: {message}")
            }
            Self::Io { path, message } => write!(f, "{path}: {message}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<rusqlite::Error> for LoadError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e.to_string())
    }
}
