use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{MocapError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub playback: PlaybackConfig,
    pub rig: RigConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections fall back to their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| MocapError::io(path, err))?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| {
            MocapError::InvalidConfig(format!("{}: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.capture.validate()?;
        self.playback.validate()
    }
}

/// Configuration for the capture cadence controller and session storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Target sampling rate in frames per second.
    pub rate: f32,
    /// Base name for saved sessions; a timestamp is appended.
    pub base_name: String,
    pub output_dir: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            rate: 30.0,
            base_name: "avatar_capture".to_string(),
            output_dir: "captureAvatar".to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(MocapError::InvalidConfig(format!(
                "capture rate must be positive, got {}",
                self.rate
            )));
        }
        if self.base_name.trim().is_empty() {
            return Err(MocapError::InvalidConfig(
                "capture base name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the playback scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub speed: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Increment used by the speed up/down commands.
    pub speed_step: f32,
    /// How often the command line driver calls `advance`, in Hz.
    pub tick_rate: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            min_speed: 0.1,
            max_speed: 3.0,
            speed_step: 0.1,
            tick_rate: 60.0,
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = |value: f32| value.is_finite() && value > 0.0;

        if !positive(self.min_speed) || !positive(self.max_speed) {
            return Err(MocapError::InvalidConfig(format!(
                "speed range must be positive, got [{}, {}]",
                self.min_speed, self.max_speed
            )));
        }
        if self.min_speed > self.max_speed {
            return Err(MocapError::InvalidConfig(format!(
                "empty speed range [{}, {}]",
                self.min_speed, self.max_speed
            )));
        }
        if !(self.min_speed..=self.max_speed).contains(&self.speed) {
            return Err(MocapError::InvalidConfig(format!(
                "default speed {} outside [{}, {}]",
                self.speed, self.min_speed, self.max_speed
            )));
        }
        if !positive(self.speed_step) {
            return Err(MocapError::InvalidConfig(format!(
                "speed step must be positive, got {}",
                self.speed_step
            )));
        }
        if !positive(self.tick_rate) {
            return Err(MocapError::InvalidConfig(format!(
                "tick rate must be positive, got {}",
                self.tick_rate
            )));
        }
        Ok(())
    }
}

/// Rig-wide switches shared by capture and playback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Sample and replay the four leg rotations.
    pub leg_rotation: bool,
}
