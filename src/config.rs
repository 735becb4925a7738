use crate::error::{IqcError, Result};
use crate::types::TimeFilterWire;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "iqc_report.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Inspection export to load when none is given on the command line.
    pub input: PathBuf,
    /// Directory receiving the report CSV/JSON files.
    pub output_dir: PathBuf,
    /// Rows shown per table in the console preview.
    pub preview_rows: usize,
    /// Year tokens searched for in worksheet names, highest priority first.
    pub sheet_years: Vec<String>,
    pub log_level: String,
    /// Default calendar filter, e.g. `{"type": "year", "value": "2025"}`;
    /// `--month`/`--year` override it.
    pub time_filter: Option<TimeFilterWire>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("iqc_data.xlsx"),
            output_dir: PathBuf::from("."),
            preview_rows: 5,
            sheet_years: ["2025", "2024", "2023", "2022", "2021"]
                .iter()
                .map(|y| y.to_string())
                .collect(),
            log_level: "info".into(),
            time_filter: None,
        }
    }
}

impl AppConfig {
    /// Load from `path` (or [`DEFAULT_CONFIG_FILE`]). A missing file means
    /// defaults; a file that exists but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| IqcError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
