use crate::error::ConfigError;
use crate::io::output::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything the two stages need, fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sampling rate used to place beats on a sample grid (Hz).
    pub sampling_rate: f64,
    /// Rows per window.
    pub window_size: usize,
    /// Fraction of a window shared with the previous one, in `[0, 1)`.
    pub overlap_ratio: f64,
    /// Raw interim column name -> semantic name.
    pub column_mapping: BTreeMap<String, String>,
    pub selected_columns: Vec<String>,
    /// Condition labels, in output order.
    pub conditions: Vec<String>,
    /// User ids, in output order within each condition.
    pub users: Vec<String>,
    pub interim_dir: PathBuf,
    pub output_format: String,
    pub ecg_delimiter: char,
    pub eda_emg_delimiter: char,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let column_mapping = [
            ("Column2", "HR_bpm"),
            ("Column3", "RR_Interval_1024"),
            ("Column4", "Exadecimal1"),
            ("Column5", "Exadecimal2"),
            ("Column6", "RR_Interval_ms"),
        ]
        .into_iter()
        .map(|(raw, name)| (raw.to_string(), name.to_string()))
        .collect();
        Self {
            sampling_rate: 1000.0,
            window_size: 150,
            overlap_ratio: 0.0,
            column_mapping,
            selected_columns: ["User", "Condition", "Timestamp", "HR_bpm", "RR_Interval_ms"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            conditions: [
                "user_cognitive-fatigue",
                "user_combo-fatigue",
                "user_physical-fatigue",
                "user_rest",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            users: (0..30).map(|i| format!("user{i}")).collect(),
            interim_dir: PathBuf::from("data/interim"),
            output_format: "csv".into(),
            ecg_delimiter: ',',
            eda_emg_delimiter: '\t',
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text).context("parsing pipeline config")?;
        Ok(config)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Rows shared by consecutive windows.
    pub fn overlap_rows(&self) -> usize {
        (self.window_size as f64 * self.overlap_ratio).floor() as usize
    }

    /// Check every value before any file is touched; returns the parsed output format.
    pub fn validate(&self) -> Result<OutputFormat, ConfigError> {
        let format = OutputFormat::parse(&self.output_format)?;
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(ConfigError::SamplingRate(self.sampling_rate));
        }
        if self.window_size == 0 {
            return Err(ConfigError::WindowSize);
        }
        if !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(ConfigError::OverlapRatio(self.overlap_ratio));
        }
        if self.conditions.is_empty() {
            return Err(ConfigError::NoConditions);
        }
        Ok(format)
    }
}
