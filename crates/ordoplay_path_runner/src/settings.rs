// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runner settings.
//!
//! A runner file describes one headless playback session:
//! - Which pattern library to load and which patterns to play
//! - Simulation timing (tick rate, frame time, length)
//! - Approach and playback tuning
//! - An optional reference frame for relative patterns
//! - Enable/disable toggles to exercise the lifecycle

use ordoplay_path_sequencer::{ApproachSettings, PatternError, PlaybackOptions, Point2, Transform2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current runner settings format version
pub const RUNNER_FORMAT_VERSION: u32 = 1;

/// Runner settings file name
pub const RUNNER_FILE_NAME: &str = "runner.ron";

/// Pattern library file name used by the default settings
pub const DEFAULT_PATTERNS_FILE: &str = "boss_patterns.ron";

/// Directory holding the bundled pattern library
pub const BUNDLED_ASSETS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets");

/// Error loading settings or running a session
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// File or output stream failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be written
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),

    /// Trace sample could not be encoded
    #[error("Failed to encode trace sample: {0}")]
    Encode(#[from] serde_json::Error),

    /// Settings written by a newer runner
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest version this runner reads
        supported: u32,
    },

    /// A setting is out of range
    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting {
        /// Setting name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Pattern library failed to load
    #[error(transparent)]
    Patterns(#[from] PatternError),
}

/// Enable or disable the mover at a point in simulated time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnableToggle {
    /// Simulated time in seconds
    pub time: f32,
    /// New enabled state
    pub enabled: bool,
}

/// Headless playback session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Format version
    pub version: u32,
    /// Pattern library, relative to the settings file
    pub patterns_path: PathBuf,
    /// Pattern names to play, in order (empty plays the whole library)
    pub playlist: Vec<String>,
    /// Fixed simulation rate in Hz
    pub tick_rate: f32,
    /// Render frame time fed to the fixed-step clock
    pub frame_time: f32,
    /// Simulated seconds
    pub duration: f32,
    /// Body start position
    pub start_position: Point2,
    /// Approach tuning
    pub approach: ApproachSettings,
    /// Looping and rest
    pub playback: PlaybackOptions,
    /// Reference frame for relative patterns
    pub reference_frame: Option<Transform2>,
    /// Lifecycle toggles; the mover starts enabled
    pub toggles: Vec<EnableToggle>,
    /// Write every Nth tick to the trace
    pub sample_every: u32,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            version: RUNNER_FORMAT_VERSION,
            patterns_path: PathBuf::from(DEFAULT_PATTERNS_FILE),
            playlist: Vec::new(),
            tick_rate: 50.0,
            frame_time: 1.0 / 60.0,
            duration: 10.0,
            start_position: Point2::new(0.0, 3.0),
            approach: ApproachSettings::default(),
            playback: PlaybackOptions::default(),
            reference_frame: Some(Transform2::from_position(Point2::new(0.0, 1.0))),
            toggles: Vec::new(),
            sample_every: 1,
        }
    }
}

impl RunnerSettings {
    /// Load settings from a file.
    ///
    /// A relative `patterns_path` is resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        let content = std::fs::read_to_string(path)?;
        let mut settings = Self::from_ron_str(&content)?;
        if let Some(dir) = path.parent() {
            settings.resolve_patterns_path(dir);
        }

        tracing::info!(path = %path.display(), "Loaded runner settings");
        Ok(settings)
    }

    /// Parse and validate settings
    pub fn from_ron_str(content: &str) -> Result<Self, RunnerError> {
        let settings: RunnerSettings = ron::from_str(content)?;

        // Version check
        if settings.version > RUNNER_FORMAT_VERSION {
            return Err(RunnerError::UnsupportedVersion {
                found: settings.version,
                supported: RUNNER_FORMAT_VERSION,
            });
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Make a relative `patterns_path` relative to `dir`
    pub fn resolve_patterns_path(&mut self, dir: &Path) {
        if self.patterns_path.is_relative() {
            self.patterns_path = dir.join(&self.patterns_path);
        }
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), RunnerError> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// Serialize to pretty RON
    pub fn to_ron_string(&self) -> Result<String, RunnerError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Check timing values
    pub fn validate(&self) -> Result<(), RunnerError> {
        positive("tick_rate", self.tick_rate)?;
        positive("frame_time", self.frame_time)?;
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(RunnerError::InvalidSetting {
                name: "duration",
                reason: format!("{} must be a non-negative number", self.duration),
            });
        }
        if self.sample_every == 0 {
            return Err(RunnerError::InvalidSetting {
                name: "sample_every",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Fixed step in seconds
    pub fn fixed_step(&self) -> f32 {
        1.0 / self.tick_rate
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), RunnerError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RunnerError::InvalidSetting {
            name,
            reason: format!("{value} must be positive"),
        })
    }
}
