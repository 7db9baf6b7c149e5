//! Receiver settings loaded from TOML
//!
//! [`ReceiverConfig`] is the immutable shaping configuration copied into the
//! pipeline at construction. [`RuntimeSettings`] only concerns the tokio loop
//! that drives the pipeline. Both sections are optional in the file; missing
//! fields take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "rc-receiver";
const CONFIG_FILE: &str = "receiver.toml";

/// Errors from loading or validating settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or a field has the wrong type
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed but lies outside the range the pipeline accepts
    ///
    /// `field` is the dotted TOML path, e.g. `receiver.margin`.
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Stick shaping parameters
///
/// Copied into the pipeline once at construction; changing a config value
/// afterwards has no effect on a running [`Receiver`](crate::receiver::Receiver).
///
/// # Performance Impact
///
/// - `margin`: wider margins make stick gestures easier to hit but also easier
///   to trigger by accident
/// - `pitch_roll_expo`: higher values soften the response around center and
///   leave full-stick authority unchanged
/// - `throttle_expo`: higher values flatten the throttle around hover
///
/// # Examples
///
/// ```rust
/// use rc_receiver::ReceiverConfig;
///
/// // Gentle setup for a first flight
/// let trainer = ReceiverConfig {
///     pitch_roll_expo: 0.8,
///     pitch_roll_rate: 0.6,
///     ..ReceiverConfig::default()
/// };
/// assert!(trainer.validate().is_ok());
/// ```
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Distance from ±1 within which a stick counts as at its extreme
    ///
    /// Used for stick-combination detection and [`throttle_is_down`]. Must lie
    /// in (0, 1).
    ///
    /// [`throttle_is_down`]: crate::receiver::Receiver::throttle_is_down
    pub margin: f32,

    /// Expo blend for roll and pitch, 0.0 (linear) to 1.0 (cubic)
    pub pitch_roll_expo: f32,

    /// Roll and pitch command at full stick, before halving
    ///
    /// A rate of 1.0 gives ±0.5 at the stick ends.
    pub pitch_roll_rate: f32,

    /// Expo blend for throttle on each side of `throttle_mid`, 0.0 to 1.0
    pub throttle_expo: f32,

    /// Throttle output at center stick, in (0, 1)
    pub throttle_mid: f32,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            margin: 0.10,          // 10% of stick travel at each end
            pitch_roll_expo: 0.65, // soft center for cyclic
            pitch_roll_rate: 0.90,
            throttle_expo: 0.20,
            throttle_mid: 0.50, // hover at center stick
        }
    }
}

impl ReceiverConfig {
    /// Reject values the shaping math is undefined for
    pub fn validate(&self) -> Result<(), ConfigError> {
        open_unit("receiver.margin", self.margin)?;
        closed_unit("receiver.pitch_roll_expo", self.pitch_roll_expo)?;
        closed_unit("receiver.throttle_expo", self.throttle_expo)?;
        open_unit("receiver.throttle_mid", self.throttle_mid)?;

        if !self.pitch_roll_rate.is_finite() || self.pitch_roll_rate <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "receiver.pitch_roll_rate",
                reason: format!("{} must be a positive number", self.pitch_roll_rate),
            });
        }
        Ok(())
    }
}

/// Settings for the task that clocks the pipeline
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Control loop rate
    pub loop_rate_hz: u32,
    /// Capacity of the stick event channel
    pub event_buffer: usize,
    /// Seconds between loop statistics log lines
    pub stats_interval_s: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            loop_rate_hz: 500,
            event_buffer: 16,
            stats_interval_s: 30,
        }
    }
}

impl RuntimeSettings {
    /// Reject settings the loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_rate_hz == 0 {
            return Err(ConfigError::Invalid {
                field: "runtime.loop_rate_hz",
                reason: "loop rate must be at least 1 Hz".to_string(),
            });
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid {
                field: "runtime.event_buffer",
                reason: "event buffer needs room for at least one event".to_string(),
            });
        }
        Ok(())
    }
}

/// Top-level settings file
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub receiver: ReceiverConfig,
    pub runtime: RuntimeSettings,
}

impl Settings {
    /// Parse and validate settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading settings from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let settings = Self::from_toml_str(&content)?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    pub async fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        if exists {
            Self::load(path).await
        } else {
            warn!(
                "Settings file {} does not exist, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Validate both sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.receiver.validate()?;
        self.runtime.validate()
    }

    /// `<config dir>/rc-receiver/receiver.toml`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }
}

fn open_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{} is outside (0, 1)", value),
        })
    }
}

fn closed_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{} is outside [0, 1]", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.receiver.margin, 0.10);
        assert_eq!(settings.runtime.loop_rate_hz, 500);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [receiver]
            pitch_roll_expo = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(settings.receiver.pitch_roll_expo, 0.5);
        assert_eq!(settings.receiver.throttle_mid, 0.5);
        assert_eq!(settings.runtime, RuntimeSettings::default());
    }

    #[test]
    fn test_full_file_parses() {
        let settings = Settings::from_toml_str(
            r#"
            [receiver]
            margin = 0.1
            pitch_roll_expo = 0.5
            pitch_roll_rate = 1.0
            throttle_expo = 0.3
            throttle_mid = 0.5

            [runtime]
            loop_rate_hz = 1000
            event_buffer = 4
            stats_interval_s = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.receiver.throttle_expo, 0.3);
        assert_eq!(settings.runtime.loop_rate_hz, 1000);
        assert_eq!(settings.runtime.event_buffer, 4);
    }

    #[test]
    fn test_margin_outside_unit_interval_is_rejected() {
        for margin in [0.0, 1.0, 1.5, -0.1] {
            let config = ReceiverConfig {
                margin,
                ..ReceiverConfig::default()
            };
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::Invalid { field: "receiver.margin", .. })
                ),
                "margin {margin} accepted"
            );
        }
    }

    #[test]
    fn test_bad_rate_and_expo_are_rejected() {
        let config = ReceiverConfig {
            pitch_roll_rate: 0.0,
            ..ReceiverConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ReceiverConfig {
            throttle_expo: 1.2,
            ..ReceiverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_loop_rate_is_rejected() {
        let err = Settings::from_toml_str("[runtime]\nloop_rate_hz = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "runtime.loop_rate_hz",
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let err = Settings::from_toml_str("[receiver\nmargin = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[tokio::test]
    async fn test_load_missing_file_reports_path() {
        let path = Path::new("/nonexistent/rc-receiver/receiver.toml");
        let err = Settings::load(path).await.unwrap_err();
        match err {
            ConfigError::Io { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_load_or_default_falls_back() {
        let path = Path::new("/nonexistent/rc-receiver/receiver.toml");
        let settings = Settings::load_or_default(path).await.unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[tokio::test]
    async fn test_load_reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("rc-receiver-{}.toml", std::process::id()));
        tokio::fs::write(&path, "[receiver]\nthrottle_mid = 0.4\n")
            .await
            .unwrap();

        let settings = Settings::load(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(settings.receiver.throttle_mid, 0.4);
    }

    #[test]
    fn test_default_path_ends_with_file_name() {
        let path = Settings::default_path();
        assert!(path.ends_with("rc-receiver/receiver.toml"));
    }
}
