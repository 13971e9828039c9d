//! CLI Exit Code Registry
//!
//! Single source of truth for `paddock` exit codes. Scripts and schedulers
//! rely on these, so existing values never change meaning.
//!
//! | Code | Meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | Success                                         |
//! | 1    | `resolve` found no candidate above threshold    |
//! | 2    | Usage error (bad arguments)                     |
//! | 3    | Invalid config (parse or validation)            |
//! | 4    | Stage failed (missing column, bad CSV, ...)     |
//! | 5    | Load failed (missing table, constraint, ...)    |
//! | 6    | I/O error (unreadable config or pool file)      |

use paddock_load::LoadError;
use paddock_stage::StageError;

pub const EXIT_SUCCESS: u8 = 0;

/// Not an error as such; like `grep(1)`, exit 1 means "nothing matched".
pub const EXIT_NO_MATCH: u8 = 1;

/// Also what clap exits with on argument errors.
pub const EXIT_USAGE: u8 = 2;

pub const EXIT_INVALID_CONFIG: u8 = 3;

pub const EXIT_STAGE_FAILED: u8 = 4;

pub const EXIT_LOAD_FAILED: u8 = 5;

pub const EXIT_IO: u8 = 6;

pub fn stage_exit_code(err: &StageError) -> u8 {
    match err {
        StageError::Config(_) => EXIT_INVALID_CONFIG,
        _ => EXIT_STAGE_FAILED,
    }
}

pub fn load_exit_code(err: &LoadError) -> u8 {
    match err {
        LoadError::Config(_) => EXIT_INVALID_CONFIG,
        _ => EXIT_LOAD_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_share_one_code() {
        assert_eq!(stage_exit_code(&StageError::Config("x".into())), EXIT_INVALID_CONFIG);
        assert_eq!(load_exit_code(&LoadError::Config("x".into())), EXIT_INVALID_CONFIG);
    }

    #[test]
    fn runtime_errors_split_by_phase() {
        let stage = StageError::MissingColumn { table: "races".into(), column: "year".into() };
        assert_eq!(stage_exit_code(&stage), EXIT_STAGE_FAILED);
        let load = LoadError::MissingTable { schema: "main".into(), table: "races".into() };
        assert_eq!(load_exit_code(&load), EXIT_LOAD_FAILED);
    }
}
