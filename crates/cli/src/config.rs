//! `paddock.toml`: one file describing the stage and the load.

use std::path::{Path, PathBuf};

use paddock_load::LoadConfig;
use paddock_stage::StageConfig;
use serde::Deserialize;

use crate::exit_codes::{load_exit_code, stage_exit_code, EXIT_INVALID_CONFIG, EXIT_IO};
use crate::CliError;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub stage: Option<StageConfig>,
    #[serde(default)]
    pub load: Option<LoadConfig>,
}

impl PipelineConfig {
    pub fn from_toml(src: &str) -> Result<Self, CliError> {
        let config: PipelineConfig = toml::from_str(src)
            .map_err(|e| CliError::new(EXIT_INVALID_CONFIG, format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CliError> {
        if self.stage.is_none() && self.load.is_none() {
            return Err(CliError::new(EXIT_INVALID_CONFIG, "config has neither [stage] nor [load]")
                .with_hint("add a [stage] section, a [load] section, or both"));
        }
        if let Some(ref stage) = self.stage {
            stage
                .validate()
                .map_err(|e| CliError::new(stage_exit_code(&e), e.to_string()))?;
        }
        if let Some(ref load) = self.load {
            load.validate()
                .map_err(|e| CliError::new(load_exit_code(&e), e.to_string()))?;
            if load.csv_dir.is_none() && self.stage.is_none() {
                return Err(CliError::new(EXIT_INVALID_CONFIG, "load.csv_dir is required without a [stage] section"));
            }
        }
        Ok(())
    }

    pub fn stage(&self) -> Result<&StageConfig, CliError> {
        self.stage
            .as_ref()
            .ok_or_else(|| CliError::new(EXIT_INVALID_CONFIG, "config has no [stage] section"))
    }

    /// Load settings with paths resolved against `base_dir`. The CSV
    /// directory defaults to the stage's output directory.
    pub fn load(&self, base_dir: &Path) -> Result<(LoadConfig, PathBuf), CliError> {
        let load = self
            .load
            .as_ref()
            .ok_or_else(|| CliError::new(EXIT_INVALID_CONFIG, "config has no [load] section"))?
            .with_base_dir(base_dir);
        let csv_dir = match (&load.csv_dir, &self.stage) {
            (Some(dir), _) => dir.clone(),
            (None, Some(stage)) => base_dir.join(&stage.output_dir),
            (None, None) => {
                return Err(CliError::new(EXIT_INVALID_CONFIG, "load.csv_dir is required without a [stage] section"))
            }
        };
        Ok((load, csv_dir))
    }
}

/// Read and validate a config file. Returns it with the directory relative
/// paths resolve against.
pub fn read_config(path: &Path) -> Result<(PipelineConfig, PathBuf), CliError> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| CliError::new(EXIT_IO, format!("cannot read {}: {e}", path.display())))?;
    let config = PipelineConfig::from_toml(&src)?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
name = "f1 staging"

[stage]
input_dir = "raw"
output_dir = "staging"

[[stage.table]]
input = "races.csv"
output = "races_staging.csv"

[load]
database = "paddock.db"
"#;

    #[test]
    fn csv_dir_defaults_to_stage_output() {
        let config = PipelineConfig::from_toml(FULL).unwrap();
        assert_eq!(config.name.as_deref(), Some("f1 staging"));
        let (load, csv_dir) = config.load(Path::new("/work")).unwrap();
        assert_eq!(csv_dir, PathBuf::from("/work/staging"));
        assert_eq!(load.database, PathBuf::from("/work/paddock.db"));
    }

    #[test]
    fn explicit_csv_dir_wins() {
        let src = FULL.replace("database = \"paddock.db\"", "database = \"paddock.db\"\ncsv_dir = \"export\"");
        let config = PipelineConfig::from_toml(&src).unwrap();
        let (_, csv_dir) = config.load(Path::new("/work")).unwrap();
        assert_eq!(csv_dir, PathBuf::from("/work/export"));
    }

    #[test]
    fn empty_config_rejected() {
        let err = PipelineConfig::from_toml("name = \"nothing\"").unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
        assert!(err.hint.is_some());
    }

    #[test]
    fn load_only_needs_csv_dir() {
        let err = PipelineConfig::from_toml("[load]\ndatabase = \"x.db\"").unwrap_err();
        assert!(err.message.contains("csv_dir"));
        assert!(PipelineConfig::from_toml("[load]\ndatabase = \"x.db\"\ncsv_dir = \"s\"").is_ok());
    }

    #[test]
    fn unknown_section_rejected() {
        let src = format!("{FULL}\n[publish]\nurl = \"x\"\n");
        let err = PipelineConfig::from_toml(&src).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
    }

    #[test]
    fn stage_validation_surfaces() {
        let src = FULL.replace("races_staging.csv", "races_staging.txt");
        let err = PipelineConfig::from_toml(&src).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
        assert!(err.message.contains(".csv"));
    }
}
