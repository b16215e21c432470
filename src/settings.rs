//! Code for loading program settings.
use crate::comparator::ComparatorOptions;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Program settings, read from an optional `settings.toml` in the dataset
/// directory
#[derive(Debug, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite output files by default
    #[serde(default)]
    pub overwrite: bool,
    /// Baseline/event comparison windows
    #[serde(default)]
    pub comparator: ComparatorOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            comparator: ComparatorOptions::default(),
        }
    }
}

impl Settings {
    /// Read the settings file from the dataset directory.
    ///
    /// If the file is not present, default values for settings will be used.
    pub fn from_path(data_dir: &Path) -> Result<Settings> {
        let file_path = data_dir.join(SETTINGS_FILE_NAME);
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(&file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_settings_from_path_no_file() {
        let dir = tempdir().unwrap();
        assert_eq!(
            Settings::from_path(dir.path()).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(
                file,
                "log_level = \"warn\"\n\n[comparator]\nbaseline_before_days = 14\nbaseline_gap_days = 7"
            )
            .unwrap();
        }

        assert_eq!(
            Settings::from_path(dir.path()).unwrap(),
            Settings {
                log_level: "warn".to_string(),
                overwrite: false,
                comparator: ComparatorOptions {
                    baseline_before_days: 14,
                    baseline_gap_days: 7,
                },
            }
        );
    }
}
