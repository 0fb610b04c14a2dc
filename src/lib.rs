//! Ear-training game core: melody generation, tone synthesis, playback and
//! level progression.

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod game;
pub mod service;
pub mod store;
pub mod theory;
pub mod timing;

pub use config::Settings;
pub use engine::PlaybackEngine;
pub use error::{AudioError, ConfigError, StoreError};
pub use events::{PlaybackStatus, SessionUpdate};
pub use game::{ChordMatchGame, GameLevel, GameMode, GamePhase, GameSession, LevelConfiguration, Progress};
pub use service::{MockSoundService, NotePlayer, SoundService};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use theory::{Chord, ChordType, Melody, Note};
