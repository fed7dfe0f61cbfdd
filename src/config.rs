//! TOML settings for a training run.
//!
//! Every field has a default, so a missing file or a partial file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logistic_regression::FeatureWiring;
use crate::validation::FoldPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "cardio.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub training: TrainingSettings,
    pub data: DataSettings,
    pub logging: LoggingSettings,
    pub report: ReportSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub learning_rate: f64,
    /// Passes over the training rows, per fold and for the final run.
    pub iterations: usize,
    pub folds: usize,
    /// Fixes the fold shuffle; `None` draws a fresh seed from the OS.
    pub seed: Option<u64>,
    pub fold_policy: FoldPolicy,
    pub wiring: FeatureWiring,
    /// Zero the coefficients left by cross-validation before the train/test run.
    pub reset_before_holdout: bool,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            learning_rate: 0.000_001,
            iterations: 1_000_000,
            folds: 5,
            seed: None,
            fold_policy: FoldPolicy::default(),
            wiring: FeatureWiring::default(),
            reset_before_holdout: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Sqlite,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub kind: SourceKind,
    pub train: PathBuf,
    pub test: PathBuf,
    /// Table holding the rows when `kind` is `sqlite`.
    pub table: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::Sqlite,
            train: PathBuf::from("database/trening_data.sqlite"),
            test: PathBuf::from("database/test_data.sqlite"),
            table: "tablica".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `tracing` filter, overridden by `RUST_LOG`.
    pub level: String,
    pub journal_db: PathBuf,
    pub journal_fallback: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            journal_db: PathBuf::from("database/logs.sqlite"),
            journal_fallback: PathBuf::from("database/logs.txt"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Where to draw the per-pass training loss of the train/test run, as SVG.
    pub loss_plot: Option<PathBuf>,
}

impl Settings {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
