use std::collections::HashSet;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::StageError;
use crate::link::{AttachSpec, JunctionSpec, LinkSide};
use crate::steps::TableSpec;

pub const DEFAULT_NULL_TOKEN: &str = "\\N";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Raw extracts. Relative paths resolve against the config file.
    pub input_dir: PathBuf,
    /// Where staged CSVs are written.
    pub output_dir: PathBuf,
    #[serde(default = "default_null_token")]
    pub null_token: String,
    #[serde(default, rename = "table")]
    pub tables: Vec<TableSpec>,
    #[serde(default)]
    pub attach: Vec<AttachSpec>,
    #[serde(default)]
    pub junction: Vec<JunctionSpec>,
}

fn default_null_token() -> String {
    DEFAULT_NULL_TOKEN.to_string()
}

impl StageConfig {
    pub fn validate(&self) -> Result<(), StageError> {
        let invalid = |msg: String| Err(StageError::Config(msg));

        if self.null_token.is_empty() {
            return invalid("null_token must not be empty".into());
        }

        let mut outputs: HashSet<&str> = HashSet::new();
        for spec in &self.tables {
            check_csv_name("table output", &spec.output)?;
            if !outputs.insert(&spec.output) {
                return invalid(format!("table output '{}' is produced twice", spec.output));
            }
        }

        for spec in &self.attach {
            check_sides("attach", &spec.source, &spec.reference)?;
            check_threshold("attach", spec.threshold)?;
            if spec.column.trim().is_empty() {
                return invalid("attach: column name must not be empty".into());
            }
            if let Some(ref output) = spec.output {
                check_csv_name("attach output", output)?;
                if !outputs.insert(output) {
                    return invalid(format!("attach output '{output}' clashes with another output"));
                }
            }
        }

        for spec in &self.junction {
            check_sides("junction", &spec.source, &spec.reference)?;
            check_threshold("junction", spec.threshold)?;
            check_csv_name("junction output", &spec.output)?;
            if !outputs.insert(&spec.output) {
                return invalid(format!("junction output '{}' clashes with another output", spec.output));
            }
            if spec.columns.len() != 2 {
                return invalid(format!(
                    "junction '{}': columns must name exactly 2 columns, got {}",
                    spec.output,
                    spec.columns.len()
                ));
            }
            if spec.columns[0] == spec.columns[1] {
                return invalid(format!("junction '{}': column names must differ", spec.output));
            }
            if spec.separators.is_empty() {
                return invalid(format!("junction '{}': separators must not be empty", spec.output));
            }
        }

        Ok(())
    }
}

fn check_csv_name(what: &str, name: &str) -> Result<(), StageError> {
    if !name.ends_with(".csv") || name.contains(&['/', '\\'][..]) {
        return Err(StageError::Config(format!(
            "{what} '{name}' must be a plain file name ending in .csv"
        )));
    }
    Ok(())
}

fn check_threshold(what: &str, threshold: f64) -> Result<(), StageError> {
    if !(0.0..=100.0).contains(&threshold) {
        return Err(StageError::Config(format!(
            "{what}: threshold must be between 0 and 100, got {threshold}"
        )));
    }
    Ok(())
}

fn check_sides(what: &str, source: &LinkSide, reference: &LinkSide) -> Result<(), StageError> {
    if source.scope.is_some() != reference.scope.is_some() {
        return Err(StageError::Config(format!(
            "{what} '{}' -> '{}': scope must be set on both sides or neither",
            source.table, reference.table
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
input_dir = "raw"
output_dir = "staging"

[[table]]
input = "races.csv"
output = "races_staging.csv"
rename = { raceId = "race_id" }

[[attach]]
column = "meeting_key"
source = { table = "races_staging.csv", key = "race_id", label = "name", scope = "year" }
reference = { table = "meetings.csv", key = "meeting_key", label = "meeting_name", scope = "year" }

[[junction]]
output = "driver_nationality_staging.csv"
columns = ["driver_id", "country_id"]
source = { table = "drivers.csv", key = "driverId", label = "nationality" }
reference = { table = "countries.csv", key = "country_id", label = "nationality" }
"#;

    fn parse(src: &str) -> Result<StageConfig, StageError> {
        let config: StageConfig = toml::from_str(src).map_err(|e| StageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn parse_valid_with_defaults() {
        let config = parse(VALID).unwrap();
        assert_eq!(config.null_token, "\\N");
        assert_eq!(config.tables.len(), 1);
        let attach = &config.attach[0];
        assert_eq!(attach.threshold, 85.0);
        assert_eq!(attach.output_name(), "races_staging.csv");
        let junction = &config.junction[0];
        assert_eq!(junction.threshold, 70.0);
        assert_eq!(junction.separators, vec!['/', '-']);
        assert_eq!(junction.scorer, paddock_resolve::Scorer::TokenSort);
    }

    #[test]
    fn reject_one_sided_scope() {
        let src = VALID.replace(
            r#"reference = { table = "meetings.csv", key = "meeting_key", label = "meeting_name", scope = "year" }"#,
            r#"reference = { table = "meetings.csv", key = "meeting_key", label = "meeting_name" }"#,
        );
        let err = parse(&src).unwrap_err();
        assert!(err.to_string().contains("both sides or neither"));
    }

    #[test]
    fn reject_threshold_out_of_range() {
        let src = VALID.replace(r#"columns = ["driver_id", "country_id"]"#, "columns = [\"driver_id\", \"country_id\"]\nthreshold = 170");
        let err = parse(&src).unwrap_err();
        assert!(err.to_string().contains("between 0 and 100"));
    }

    #[test]
    fn reject_three_junction_columns() {
        let src = VALID.replace(r#"["driver_id", "country_id"]"#, r#"["driver_id", "country_id", "extra"]"#);
        let err = parse(&src).unwrap_err();
        assert!(err.to_string().contains("exactly 2"));
    }

    #[test]
    fn reject_clashing_outputs() {
        let src = VALID.replace("driver_nationality_staging.csv", "races_staging.csv");
        let err = parse(&src).unwrap_err();
        assert!(err.to_string().contains("clashes"));
    }

    #[test]
    fn reject_non_csv_output() {
        let src = VALID.replace("races_staging.csv\"\nrename", "races_staging.tsv\"\nrename");
        let err = parse(&src).unwrap_err();
        assert!(err.to_string().contains("ending in .csv"));
    }

    #[test]
    fn reject_unknown_scorer() {
        let src = VALID.replace("column = \"meeting_key\"", "column = \"meeting_key\"\nscorer = \"soundex\"");
        assert!(parse(&src).is_err());
    }
}
