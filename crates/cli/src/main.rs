// paddock - motorsport staging pipeline: transform raw extracts, link labels, bulk load

mod config;
mod exit_codes;
mod pipeline;
mod resolve;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use env_logger::Env;
use paddock_resolve::Scorer;

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "paddock")]
#[command(about = "Stage raw motorsport extracts, resolve free-text labels to keys, bulk load the result")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stage: table steps, attach and junction passes, write staged CSVs
    #[command(after_help = "\
Examples:
  paddock transform paddock.toml
  paddock transform paddock.toml --json
  paddock transform paddock.toml --output stage-report.json")]
    Transform {
        /// Path to the paddock.toml config file
        config: PathBuf,

        /// Output JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON report to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Bulk load staged CSVs into the database
    #[command(after_help = "\
Examples:
  paddock load paddock.toml
  paddock load paddock.toml --plan
  paddock load paddock.toml --json")]
    Load {
        /// Path to the paddock.toml config file
        config: PathBuf,

        /// Show files, targets and load order without touching the database
        #[arg(long)]
        plan: bool,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Transform, then load
    #[command(after_help = "\
Examples:
  paddock run paddock.toml
  paddock run paddock.toml --json > run.json")]
    Run {
        /// Path to the paddock.toml config file
        config: PathBuf,

        /// Output JSON report to stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate a config without running anything
    #[command(after_help = "\
Examples:
  paddock validate paddock.toml")]
    Validate {
        /// Path to the paddock.toml config file
        config: PathBuf,
    },

    /// Resolve one label against a reference CSV
    #[command(after_help = "\
Examples:
  paddock resolve 'Bahrain Grand Prix' --pool meetings.csv --key meeting_key --label meeting_name
  paddock resolve 'British/American' --pool countries.csv --key country_id --label nationality --split --threshold 70
  paddock resolve 'abu dhabi gp' --pool meetings.csv --key meeting_key --label meeting_name --scorer token-set --json

Exit codes:
  0  matched
  1  nothing scored at or above the threshold")]
    Resolve {
        /// Free-text label to resolve
        label: String,

        /// Reference CSV file
        #[arg(long)]
        pool: PathBuf,

        /// Column holding reference keys
        #[arg(long)]
        key: String,

        /// Column holding reference labels
        #[arg(long = "label")]
        label_column: String,

        /// Minimum score (0-100) for a match
        #[arg(long, default_value_t = 85.0)]
        threshold: f64,

        /// Similarity scorer: token-sort or token-set
        #[arg(long, default_value = "token-sort")]
        scorer: Scorer,

        /// Split the label on / and - and resolve each part
        #[arg(long)]
        split: bool,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Transform { config, json, output } => pipeline::cmd_transform(config, json, output),
        Commands::Load { config, plan, json } => pipeline::cmd_load(config, plan, json),
        Commands::Run { config, json } => pipeline::cmd_run(config, json),
        Commands::Validate { config } => pipeline::cmd_validate(config),
        Commands::Resolve {
            label,
            pool,
            key,
            label_column,
            threshold,
            scorer,
            split,
            json,
        } => resolve::cmd_resolve(resolve::ResolveArgs {
            label,
            pool,
            key,
            label_column,
            threshold,
            scorer,
            split,
            json,
        }),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
