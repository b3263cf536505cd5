//! Configuration management for delta_fetcher
//!
//! Every component receives an explicit [`Settings`] value at construction;
//! there is no ambient global state. Settings come from a small TOML file
//! with zero-config defaults, overridable from the command line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::app::engine::default_concurrency;
use crate::constants::paths;
use crate::errors::{ConfigError, ConfigResult};

/// Resolved runtime settings of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Main working directory all other paths derive from
    pub main_dir: PathBuf,
    /// Staging area root, one subdirectory per plugin
    pub temp_dir: PathBuf,
    /// Permanent download root, one subdirectory per plugin
    pub download_dir: PathBuf,
    /// Save-state directory shared by all plugins
    pub savestate_dir: PathBuf,
    /// Default download concurrency for plugins without an override
    pub concurrency: usize,
    /// Suppress the interactive progress bar
    pub disable_progress: bool,
}

impl Settings {
    /// Derive settings from a main directory with default tuning
    pub fn new(main_dir: impl Into<PathBuf>) -> Self {
        let main_dir = main_dir.into();
        Self {
            temp_dir: main_dir.join(paths::TEMP_DIR_NAME),
            download_dir: main_dir.join(paths::DOWNLOAD_DIR_NAME),
            savestate_dir: main_dir.join(paths::SAVESTATE_DIR_NAME),
            concurrency: default_concurrency(),
            disable_progress: false,
            main_dir,
        }
    }

    /// Override the default download concurrency
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Create the directory tree the settings describe
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a path exists but is not a
    /// directory, and `ConfigError::Io` when creation fails (permission
    /// failures here abort the run).
    pub fn prepare(&self) -> ConfigResult<()> {
        for dir in [
            &self.main_dir,
            &self.temp_dir,
            &self.download_dir,
            &self.savestate_dir,
        ] {
            if dir.exists() && !dir.is_dir() {
                return Err(ConfigError::InvalidValue {
                    field: "directory".to_string(),
                    value: dir.display().to_string(),
                    reason: "exists but is not a directory".to_string(),
                });
            }
            std::fs::create_dir_all(dir)?;
        }
        debug!("prepared directory tree under {}", self.main_dir.display());
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new("./")
    }
}

/// On-disk representation of the settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Main working directory; defaults to the current directory
    pub main_dir: Option<PathBuf>,
    /// Default download concurrency; defaults to the available parallelism
    pub concurrency: Option<usize>,
    /// Suppress the interactive progress bar
    pub disable_progress: Option<bool>,
}

impl SettingsFile {
    /// Default location of the settings file under the user config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(paths::APP_DIR_NAME).join(paths::CONFIG_FILE_NAME))
    }

    /// Load the settings file, falling back to defaults when absent
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when an existing file cannot be read or parsed.
    /// A missing file is the zero-config default, not an error.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => {
                    warn!("no user config directory available, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            debug!("no settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let file: Self = toml::from_str(&raw)?;
        debug!("loaded settings from {}", path.display());
        Ok(file)
    }

    /// Resolve the file contents into runtime settings
    ///
    /// A zero `concurrency` value in the file is invalid; it is logged and
    /// replaced by the default rather than accepted.
    pub fn into_settings(self) -> Settings {
        let mut settings =
            Settings::new(self.main_dir.unwrap_or_else(|| PathBuf::from("./")));
        match self.concurrency {
            Some(0) => {
                warn!("configured concurrency 0 is invalid, using default");
            }
            Some(concurrency) => settings.concurrency = concurrency,
            None => {}
        }
        if let Some(disable) = self.disable_progress {
            settings.disable_progress = disable;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_settings_derive_directory_layout() {
        let settings = Settings::new("/tmp/dl");
        assert_eq!(settings.temp_dir, PathBuf::from("/tmp/dl/temp"));
        assert_eq!(settings.download_dir, PathBuf::from("/tmp/dl/downloads"));
        assert_eq!(settings.savestate_dir, PathBuf::from("/tmp/dl/savestates"));
        assert!(settings.concurrency >= 1);
    }

    #[test]
    fn test_prepare_creates_tree() {
        let dir = tempdir().unwrap();
        let settings = Settings::new(dir.path().join("nested/main"));
        settings.prepare().unwrap();

        assert!(settings.temp_dir.is_dir());
        assert!(settings.download_dir.is_dir());
        assert!(settings.savestate_dir.is_dir());
    }

    #[test]
    fn test_prepare_rejects_file_in_place_of_directory() {
        let dir = tempdir().unwrap();
        let main = dir.path().join("main");
        std::fs::create_dir(&main).unwrap();
        std::fs::write(main.join("temp"), "not a directory").unwrap();

        let settings = Settings::new(&main);
        assert!(matches!(
            settings.prepare(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_settings_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "main_dir = \"/tmp/dl\"\nconcurrency = 3\n").unwrap();

        let file = SettingsFile::load_or_default(Some(&path)).unwrap();
        let settings = file.into_settings();
        assert_eq!(settings.main_dir, PathBuf::from("/tmp/dl"));
        assert_eq!(settings.concurrency, 3);
        assert!(!settings.disable_progress);
    }

    #[test]
    fn test_missing_settings_file_defaults() {
        let dir = tempdir().unwrap();
        let file =
            SettingsFile::load_or_default(Some(&dir.path().join("absent.toml"))).unwrap();
        let settings = file.into_settings();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_concurrency_falls_back() {
        let file = SettingsFile {
            concurrency: Some(0),
            ..Default::default()
        };
        let settings = file.into_settings();
        assert_eq!(settings.concurrency, default_concurrency());
    }

    #[test]
    fn test_broken_settings_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "main_dir = [not toml").unwrap();

        assert!(matches!(
            SettingsFile::load_or_default(Some(&path)),
            Err(ConfigError::InvalidFormat(_))
        ));
    }
}
