// ⚙️ Configuration - Runtime settings
//
// Defaults mirror the on-disk layout the generator and dashboards expect.
// Values come from a TOML file, then environment variables (`.env` honoured).

use crate::metrics::JoinPolicy;
use crate::period::YearMonth;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "vahan.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub vehicle_type_dir: PathBuf,
    pub manufacturer_dir: PathBuf,
    pub analysis_dir: PathBuf,
    pub metrics_dir: PathBuf,
    pub logs_dir: PathBuf,

    /// First generated month
    pub start: YearMonth,
    /// Last generated month (inclusive)
    pub end: YearMonth,

    pub period_field: String,
    pub value_field: String,
    pub group_fields: Vec<String>,
    pub join: JoinPolicy,

    /// Name recorded in summary reports
    pub generated_by: String,

    pub server_addr: String,
    /// Reload cached metric files at least this often (None = only on change)
    pub cache_ttl_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data"),
            vehicle_type_dir: PathBuf::from("data/vehicle_type"),
            manufacturer_dir: PathBuf::from("data/manufacturer"),
            analysis_dir: PathBuf::from("data/analysis"),
            metrics_dir: PathBuf::from("data/metrics"),
            logs_dir: PathBuf::from("logs"),
            start: YearMonth::new_unchecked(2020, 1),
            end: YearMonth::new_unchecked(2025, 12),
            period_field: "year_month".to_string(),
            value_field: "registration_count".to_string(),
            group_fields: vec!["vehicle_type".to_string()],
            join: JoinPolicy::Inner,
            generated_by: "vahan-growth".to_string(),
            server_addr: "0.0.0.0:3000".to_string(),
            cache_ttl_secs: None,
        }
    }
}

impl Config {
    /// Load from `path` if given, else from `vahan.toml` if it exists, else
    /// defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };

        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no run can use (e.g. `end` before `start`)
    pub fn validate(&self) -> Result<()> {
        if self.end < self.start {
            anyhow::bail!("end ({}) is before start ({})", self.end, self.start);
        }
        if self.group_fields.is_empty() {
            anyhow::bail!("group_fields must name at least one column");
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = env::var("VAHAN_DATA_DIR") {
            self.set_data_dir(PathBuf::from(dir));
        }
        if let Ok(dir) = env::var("VAHAN_METRICS_DIR") {
            self.metrics_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("VAHAN_LOGS_DIR") {
            self.logs_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = env::var("VAHAN_SERVER_ADDR") {
            self.server_addr = addr;
        }
    }

    /// Move the data root, keeping the standard sub-directory layout
    pub fn set_data_dir(&mut self, data_dir: PathBuf) {
        self.vehicle_type_dir = data_dir.join("vehicle_type");
        self.manufacturer_dir = data_dir.join("manufacturer");
        self.analysis_dir = data_dir.join("analysis");
        self.metrics_dir = data_dir.join("metrics");
        self.data_dir = data_dir;
    }

    /// Every directory the pipeline writes into
    pub fn directories(&self) -> Vec<&Path> {
        vec![
            self.data_dir.as_path(),
            self.vehicle_type_dir.as_path(),
            self.manufacturer_dir.as_path(),
            self.analysis_dir.as_path(),
            self.metrics_dir.as_path(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.start.to_string(), "2020-01");
        assert_eq!(config.end.to_string(), "2025-12");
        assert_eq!(config.metrics_dir, PathBuf::from("data/metrics"));
        assert_eq!(config.group_fields, vec!["vehicle_type"]);
        assert_eq!(config.join, JoinPolicy::Inner);
    }

    #[test]
    fn test_config_from_toml_partial() {
        let config = Config::from_toml(
            r#"
            start = "2021-06"
            end = "2022-05"
            join = "outer"
            group_fields = ["manufacturer", "vehicle_type"]
            "#,
        )
        .unwrap();

        assert_eq!(config.start.to_string(), "2021-06");
        assert_eq!(config.join, JoinPolicy::Outer);
        assert_eq!(config.group_fields.len(), 2);
        // Untouched fields keep their defaults
        assert_eq!(config.value_field, "registration_count");
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(Config::from_toml(r#"start = "2021/06""#).is_err());
        assert!(Config::from_toml("start = \"2022-01\"\nend = \"2021-01\"").is_err());
    }

    #[test]
    fn test_validate_catches_fields_set_directly() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.start = "2022-01".parse().unwrap();
        config.end = "2021-01".parse().unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("before start"));

        // A single-month range is fine
        config.end = config.start;
        assert!(config.validate().is_ok());

        config.group_fields.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_set_data_dir_moves_layout() {
        let mut config = Config::default();
        config.set_data_dir(PathBuf::from("/tmp/vahan"));
        assert_eq!(config.metrics_dir, PathBuf::from("/tmp/vahan/metrics"));
        assert_eq!(config.manufacturer_dir, PathBuf::from("/tmp/vahan/manufacturer"));
        assert_eq!(config.directories().len(), 5);
    }
}
