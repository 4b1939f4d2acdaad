use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration, read from a JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub progression: ProgressionConfig,
    #[serde(default = "default_sources")]
    pub sources: Vec<DriveSource>,
}

/// Geometry and thresholds used to decide whether an action is progressive.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ProgressionConfig {
    #[serde(default = "default_goal_x")]
    pub goal_x: f64,
    #[serde(default = "default_goal_y")]
    pub goal_y: f64,
    /// An action is progressive only if `end / beginning` is below this.
    #[serde(default = "default_min_progression_ratio")]
    pub min_progression_ratio: f64,
    /// Actions starting this close to goal, or closer, are never progressive.
    #[serde(default = "default_min_start_distance")]
    pub min_start_distance: f64,
}

/// A CSV export on Google Drive and the parquet file it becomes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DriveSource {
    pub file_id: String,
    pub parquet_file: String,
}

fn default_goal_x() -> f64 {
    120.0
}

fn default_goal_y() -> f64 {
    40.0
}

fn default_min_progression_ratio() -> f64 {
    0.75
}

fn default_min_start_distance() -> f64 {
    1.0
}

fn default_sources() -> Vec<DriveSource> {
    [
        ("1z_Bb2kf48NqwrRO_ZSZeJLhE9mJ1ps71", "Bundesliga_2425.parquet"),
        ("1zeJtDsuTNwd3EKc9fY5FhNBdfl9sV9an", "La_Liga_24_25.parquet"),
        ("154GIano_ASZIGf3cOayy7OCIF9NjJx2x", "Ligue_1_2425.parquet"),
        ("1mCq0wlrlnohawuuYCZPTulvkQwqdeYt6", "Premier_League_2425.parquet"),
        ("1OVkg5E2whpoE_snZT2fxkN_8mMgnSU0i", "Serie_A_2425.parquet"),
    ]
    .into_iter()
    .map(|(file_id, parquet_file)| DriveSource {
        file_id: file_id.to_string(),
        parquet_file: parquet_file.to_string(),
    })
    .collect()
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            goal_x: default_goal_x(),
            goal_y: default_goal_y(),
            min_progression_ratio: default_min_progression_ratio(),
            min_start_distance: default_min_start_distance(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            progression: ProgressionConfig::default(),
            sources: default_sources(),
        }
    }
}

impl Config {
    /// Loads the config at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let contents = fs::read_to_string(path)?;
                serde_json::from_str::<Config>(&contents)?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.progression.validate()?;
        for source in &self.sources {
            if source.file_id.trim().is_empty() {
                return Err(Error::Config("source with empty file_id".to_string()));
            }
            if source.parquet_file.trim().is_empty() {
                return Err(Error::Config(format!(
                    "source {} has an empty parquet_file",
                    source.file_id
                )));
            }
        }
        Ok(())
    }
}

impl ProgressionConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.goal_x.is_finite() || !self.goal_y.is_finite() {
            return Err(Error::Config(format!(
                "goal center ({}, {}) must be finite",
                self.goal_x, self.goal_y
            )));
        }
        let ratio = self.min_progression_ratio;
        if ratio.is_nan() || ratio <= 0.0 || ratio > 1.0 {
            return Err(Error::Config(format!(
                "min_progression_ratio {} must be in (0, 1]",
                self.min_progression_ratio
            )));
        }
        if self.min_start_distance.is_nan() || self.min_start_distance < 0.0 {
            return Err(Error::Config(format!(
                "min_start_distance {} must be non-negative",
                self.min_start_distance
            )));
        }
        Ok(())
    }
}
