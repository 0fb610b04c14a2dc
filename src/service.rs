use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::events::{PlaybackStatus, StatusTracker};
use crate::theory::{Chord, Melody, Note};
use crate::timing::MelodyScheduler;

/// Anything that can sound a single note. The melody scheduler drives one of these.
pub trait NotePlayer: Send + Sync {
    /// `duration` in seconds, `volume` a linear gain in [0, 1].
    fn play_note(&self, note: Note, octave: i32, duration: f64, volume: f32);
}

/// The playback surface the game talks to.
pub trait SoundService: NotePlayer {
    /// Starts every chord tone at once.
    fn play_chord(&self, chord: &Chord, duration: f64, volume: f32);

    /// Stops whatever is playing, then sequences `melody` in the background.
    fn play_melody(&self, melody: &Melody, volume: f32);

    /// Cancels melody sequencing and silences every voice. Safe to call at
    /// any time, any number of times.
    fn stop_all(&self);

    /// Applies pending playback updates and returns the current flags. Call
    /// from the foreground only.
    fn status(&self) -> PlaybackStatus;
}

/// A call recorded by [`MockSoundService`].
#[derive(Debug, Clone, PartialEq)]
pub enum SoundCall {
    Note {
        note: Note,
        octave: i32,
        duration: f64,
        volume: f32,
    },
    Chord {
        chord: Chord,
        duration: f64,
        volume: f32,
    },
    Melody {
        notes: Vec<Note>,
        tempo: f64,
    },
    StopAll,
}

struct MockInner {
    calls: Mutex<Vec<SoundCall>>,
    scheduler: MelodyScheduler,
    tracker: StatusTracker,
}

/// Silent sound service that logs and records every call. Melodies are still
/// sequenced in real time so timing and cancellation behave like the engine.
#[derive(Clone)]
pub struct MockSoundService {
    inner: Arc<MockInner>,
}

impl MockSoundService {
    pub fn new() -> Self {
        let (update_tx, tracker) = StatusTracker::new();
        Self {
            inner: Arc::new(MockInner {
                calls: Mutex::new(Vec::new()),
                scheduler: MelodyScheduler::new(update_tx),
                tracker,
            }),
        }
    }

    pub fn calls(&self) -> Vec<SoundCall> {
        self.inner.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.inner.calls.lock().clear();
    }

    fn record(&self, call: SoundCall) {
        self.inner.calls.lock().push(call);
    }
}

impl Default for MockSoundService {
    fn default() -> Self {
        Self::new()
    }
}

impl NotePlayer for MockSoundService {
    fn play_note(&self, note: Note, octave: i32, duration: f64, volume: f32) {
        info!("playing note {}{}", note, octave);
        self.record(SoundCall::Note {
            note,
            octave,
            duration,
            volume,
        });
    }
}

impl SoundService for MockSoundService {
    fn play_chord(&self, chord: &Chord, duration: f64, volume: f32) {
        info!("playing chord {}", chord);
        self.record(SoundCall::Chord {
            chord: *chord,
            duration,
            volume,
        });
    }

    fn play_melody(&self, melody: &Melody, volume: f32) {
        info!("playing melody with {} notes", melody.len());
        self.stop_all();
        self.record(SoundCall::Melody {
            notes: melody.pitches(),
            tempo: melody.tempo(),
        });
        self.inner
            .scheduler
            .start(melody.clone(), self.clone(), volume);
    }

    fn stop_all(&self) {
        info!("stopping all sounds");
        self.inner.scheduler.cancel();
        self.inner.tracker.reset();
        self.record(SoundCall::StopAll);
    }

    fn status(&self) -> PlaybackStatus {
        let status = self.inner.tracker.refresh(false);
        PlaybackStatus {
            is_playing: status.is_melody_playing,
            ..status
        }
    }
}
