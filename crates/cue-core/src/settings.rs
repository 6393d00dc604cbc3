use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TableGeometry;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for the frame acquisition pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Upper bound for a single blocking frame read, in milliseconds.
    pub read_timeout_ms: u64,
    /// Number of consecutive failed reads after which the recording thread
    /// gives up and the pipeline closes.
    pub max_consecutive_errors: u32,
    /// Pause between polls when the state tracker finds no new frame, in
    /// milliseconds.
    pub idle_poll_ms: u64,
}

impl CaptureSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            read_timeout_ms: 100,
            max_consecutive_errors: 10,
            idle_poll_ms: 5,
        }
    }
}

/// Constants of the ball motion model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Rolling friction coefficient between ball and cloth
    pub friction_coefficient: f64,
    /// Velocities are divided by `1 + energy_loss_by_ball` when two balls
    /// collide.
    pub energy_loss_by_ball: f64,
    /// Velocities are divided by `1 + energy_loss_by_rail` when a ball hits
    /// a cushion.
    pub energy_loss_by_rail: f64,
}

impl PhysicsSettings {
    /// Standard gravity in mm/s²
    pub const GRAVITY: f64 = 9800.0;

    /// Deceleration of a rolling ball, in mm/s².
    pub fn rolling_deceleration(&self) -> f64 {
        Self::GRAVITY * self.friction_coefficient
    }
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            friction_coefficient: 0.0142435,
            energy_loss_by_ball: 0.05,
            energy_loss_by_rail: 0.5,
        }
    }
}

/// All runtime settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub table: TableGeometry,
    pub capture: CaptureSettings,
    pub physics: PhysicsSettings,
}

impl Settings {
    /// Load settings from a JSON file. Missing fields take their default
    /// values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Load the settings from a file, or store the default settings if the
    /// file does not exist.
    pub fn load_or_insert(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        match fs::read_to_string(path.as_ref()) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::default();
                log::info!(
                    "No settings at {}, writing defaults",
                    path.as_ref().display()
                );
                settings.store(path)?;
                Ok(settings)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Store the settings in the given file.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_or_insert_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = Settings::load_or_insert(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());

        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "capture": { "max_consecutive_errors": 3 } }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.capture.max_consecutive_errors, 3);
        assert_eq!(settings.capture.read_timeout_ms, 100);
        assert_eq!(settings.table, TableGeometry::default());
        assert_eq!(settings.physics, PhysicsSettings::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(SettingsError::Parse(_))
        ));
    }
}
