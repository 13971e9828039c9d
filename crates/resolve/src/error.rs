use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// The same key appears twice in a pool with different labels.
    ConflictingKey { key: String, first: String, second: String },
    /// Threshold outside the 0..=100 score range.
    InvalidThreshold(f64),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConflictingKey { key, first, second } => write!(
                f,
                "candidate pool has key '{key}' with conflicting labels '{first}' and '{second}'"
            ),
            Self::InvalidThreshold(t) => {
                write!(f, "threshold must be between 0 and 100, got {t}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}
