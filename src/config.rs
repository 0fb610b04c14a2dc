use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::SAMPLE_RATE;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Gain for single notes and melodies
    pub note_volume: f32,
    /// Gain for each chord tone
    pub chord_volume: f32,
    /// Output gain applied after mixing; can change while playing
    pub master_gain: f32,
    pub preferred_sample_rate: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            note_volume: 0.5,
            chord_volume: 0.3,
            master_gain: 1.0,
            preferred_sample_rate: SAMPLE_RATE,
        }
    }
}

/// Shape of generated melodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MelodySettings {
    pub tempo: f64,
    pub octave: i32,
    pub note_beats: f64,
}

impl Default for MelodySettings {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            octave: 4,
            note_beats: 0.5,
        }
    }
}

/// Lengths of the short previews played on selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditionSettings {
    pub note_seconds: f64,
    pub chord_seconds: f64,
}

impl Default for AuditionSettings {
    fn default() -> Self {
        Self {
            note_seconds: 0.3,
            chord_seconds: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeSettings {
    pub grid_size: usize,
    pub min_length: usize,
    pub max_length: usize,
}

impl ChallengeSettings {
    pub fn length_range(&self) -> RangeInclusive<usize> {
        let min = self.min_length.max(1);
        min..=self.max_length.max(min)
    }
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            grid_size: 9,
            min_length: 4,
            max_length: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub melody: MelodySettings,
    pub audition: AuditionSettings,
    pub challenge: ChallengeSettings,
    /// Where progress (unlocked levels, best streak) is kept
    pub store_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio: AudioSettings::default(),
            melody: MelodySettings::default(),
            audition: AuditionSettings::default(),
            challenge: ChallengeSettings::default(),
            store_path: PathBuf::from("earstreak-progress.ron"),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Missing or broken files fall back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!("{}; using defaults", e);
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
