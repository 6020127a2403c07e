use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ConfigError;

/// Structure representing the application configuration. Contains pathing
/// and run information.
/// Configs are serializable and deserializable to YAML using serde and
/// serde_yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub raw_path: PathBuf,
    pub mapping_path: PathBuf,
    pub crate_path: PathBuf,
    pub output_path: PathBuf,
    pub make_trigger_digits: bool,
    pub first_run_number: i32,
    pub last_run_number: i32,
    pub n_threads: i32,
}

impl Default for Config {
    /// Generate a new Config object. All fields will be empty/invalid
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("None"),
            mapping_path: PathBuf::from("None"),
            crate_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            make_trigger_digits: true,
            first_run_number: 0,
            last_run_number: 0,
            n_threads: 1,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file.
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Check if a specific run exists by looking for its raw event file
    pub fn does_run_exist(&self, run_number: i32) -> bool {
        self.get_raw_file_name(run_number).exists()
    }

    /// Get the path to a run's raw event file
    pub fn get_raw_file_name(&self, run_number: i32) -> PathBuf {
        self.raw_path
            .join(format!("{}.raw", self.get_run_str(run_number)))
    }

    /// Get the path to the digest written for a run
    pub fn get_digest_file_name(&self, run_number: i32) -> Result<PathBuf, ConfigError> {
        if self.output_path.exists() {
            Ok(self
                .output_path
                .join(format!("{}.digits.yaml", self.get_run_str(run_number))))
        } else {
            Err(ConfigError::BadFilePath(self.output_path.clone()))
        }
    }

    /// Construct the run string using the DAQ naming format
    fn get_run_str(&self, run_number: i32) -> String {
        format!("run_{run_number:0>4}")
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }
}
