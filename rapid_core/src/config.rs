//! Configuration file support for Rapid Response Central.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/rrc/config.toml`.

use crate::ticker::TickInterval;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub timers: TimerSettings,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Timer behaviour during a response
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerSettings {
    /// Length of one CPR cycle, in seconds
    #[serde(default = "default_cpr_interval_secs")]
    pub cpr_interval_secs: u64,

    /// Interval between repeat medication doses, in seconds
    #[serde(default = "default_medication_interval_secs")]
    pub medication_interval_secs: u64,

    /// Start the duration timer when an emergency is activated
    #[serde(default = "default_auto_start_timers")]
    pub auto_start_timers: bool,

    #[serde(default)]
    pub show_milliseconds: bool,

    /// Warn this many seconds before a CPR cycle ends
    #[serde(default = "default_alert_before_interval_secs")]
    pub alert_before_interval_secs: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            cpr_interval_secs: default_cpr_interval_secs(),
            medication_interval_secs: default_medication_interval_secs(),
            auto_start_timers: default_auto_start_timers(),
            show_milliseconds: false,
            alert_before_interval_secs: default_alert_before_interval_secs(),
        }
    }
}

impl TimerSettings {
    /// Tick granularity implied by the display preference
    pub fn tick_interval(&self) -> TickInterval {
        if self.show_milliseconds {
            TickInterval::Centiseconds
        } else {
            TickInterval::Seconds
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cpr_interval_secs == 0 {
            return Err(Error::Config("cpr_interval_secs must be positive".into()));
        }
        if self.medication_interval_secs == 0 {
            return Err(Error::Config(
                "medication_interval_secs must be positive".into(),
            ));
        }
        if self.alert_before_interval_secs >= self.cpr_interval_secs {
            return Err(Error::Config(format!(
                "alert_before_interval_secs ({}) must be shorter than the CPR cycle ({})",
                self.alert_before_interval_secs, self.cpr_interval_secs
            )));
        }
        Ok(())
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(std::env::temp_dir)
    });
    base.join("rrc")
}

fn default_cpr_interval_secs() -> u64 {
    120
}

fn default_medication_interval_secs() -> u64 {
    180
}

fn default_auto_start_timers() -> bool {
    true
}

fn default_alert_before_interval_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.timers.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(std::env::temp_dir)
        });
        base.join("rrc").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timers.cpr_interval_secs, 120);
        assert_eq!(config.timers.medication_interval_secs, 180);
        assert!(config.timers.auto_start_timers);
        assert!(!config.timers.show_milliseconds);
        assert_eq!(config.timers.alert_before_interval_secs, 10);
        assert!(config.timers.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[timers]
cpr_interval_secs = 90
show_milliseconds = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timers.cpr_interval_secs, 90);
        assert_eq!(config.timers.medication_interval_secs, 180); // default
        assert_eq!(config.timers.tick_interval(), TickInterval::Centiseconds);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.timers.auto_start_timers = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.timers, config.timers);
    }

    #[test]
    fn test_rejects_warning_longer_than_cycle() {
        let settings = TimerSettings {
            cpr_interval_secs: 10,
            alert_before_interval_secs: 10,
            ..TimerSettings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
    }
}
