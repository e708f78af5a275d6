use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExperimentError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub stimulus: StimulusConfig,
    pub design: DesignConfig,
    pub log: LogConfig,
}

/// Shape appearance and grid geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConfig {
    pub base_size: f32,
    pub base_opacity: f32,
    /// Multiplier for the "large/high" extreme.
    pub large_factor: f32,
    /// Multiplier for the "small/low" extreme.
    pub small_factor: f32,
    /// A uniform draw above this picks the large/high extreme.
    pub extreme_threshold: f64,
    pub cell_size: f32,
    pub placeholder_size: f32,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            base_size: 40.0,
            base_opacity: 0.6,
            large_factor: 1.4,
            small_factor: 0.6,
            extreme_threshold: 0.5,
            cell_size: 60.0,
            placeholder_size: 56.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignConfig {
    pub delimiter: char,
    pub columns: ColumnNames,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            columns: ColumnNames::default(),
        }
    }
}

/// Header names of the design table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub participant: String,
    pub practice: String,
    pub block1: String,
    pub block2: String,
    pub difference_type: String,
    pub object_count: String,
    pub design_name: String,
    pub trial_id: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            participant: "ParticipantID".into(),
            practice: "Practice".into(),
            block1: "Block1".into(),
            block2: "Block2".into(),
            difference_type: "DT".into(),
            object_count: "OC".into(),
            design_name: "DesignName".into(),
            trial_id: "TrialID".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub delimiter: char,
    pub export_dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            export_dir: PathBuf::from("."),
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ExperimentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ExperimentError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        delimiter_byte(self.design.delimiter)?;
        delimiter_byte(self.log.delimiter)?;

        let s = &self.stimulus;
        if s.base_size <= 0.0 || s.cell_size <= 0.0 || s.placeholder_size <= 0.0 {
            return Err(ExperimentError::Config(
                "sizes must be positive".to_string(),
            ));
        }
        if s.large_factor <= s.small_factor {
            return Err(ExperimentError::Config(format!(
                "large_factor ({}) must exceed small_factor ({})",
                s.large_factor, s.small_factor
            )));
        }
        if !(0.0..=1.0).contains(&s.extreme_threshold) {
            return Err(ExperimentError::Config(format!(
                "extreme_threshold {} is outside [0, 1]",
                s.extreme_threshold
            )));
        }
        Ok(())
    }
}

/// Delimiters are single ASCII bytes other than line breaks and the csv
/// quote character.
pub(crate) fn delimiter_byte(delimiter: char) -> Result<u8> {
    match delimiter {
        '\n' | '\r' | '"' => Err(ExperimentError::Config(format!(
            "delimiter {delimiter:?} is reserved"
        ))),
        c if c.is_ascii() => Ok(c as u8),
        _ => Err(ExperimentError::Config(format!(
            "delimiter {delimiter:?} must be a single ASCII character"
        ))),
    }
}
