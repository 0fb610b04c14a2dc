use std::path::PathBuf;

use thiserror::Error;

pub type AudioResult<T> = Result<T, AudioError>;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("invalid tone: {frequency} Hz for {duration} s at volume {volume}")]
    InvalidTone {
        frequency: f64,
        duration: f64,
        volume: f32,
    },

    #[error("tone of {frames} frames exceeds the {max} frame limit")]
    BufferTooLarge { frames: usize, max: usize },

    #[error("no output audio device available")]
    NoOutputDevice,

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("audio output thread exited before reporting")]
    OutputThread,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode value: {0}")]
    Encode(#[from] ron::Error),

    #[error("failed to decode store: {0}")]
    Decode(#[from] ron::error::SpannedError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("failed to encode settings: {0}")]
    Encode(#[from] ron::Error),
}
