use serde::{Deserialize, Serialize};

use super::Note;

/// One entry of a melody: a pitch in a given octave held for some beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MelodyNote {
    pub note: Note,
    pub octave: i32,
    pub beats: f64,
}

impl MelodyNote {
    pub fn new(note: Note, octave: i32, beats: f64) -> Self {
        Self {
            note,
            octave,
            beats,
        }
    }
}

/// An ordered note sequence at a fixed tempo. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Melody {
    notes: Vec<MelodyNote>,
    tempo: f64,
}

impl Melody {
    /// `tempo` is in beats per minute and must be positive.
    pub fn new(notes: Vec<MelodyNote>, tempo: f64) -> Self {
        debug_assert!(tempo > 0.0, "tempo must be positive");
        Self { notes, tempo }
    }

    /// Every note in `notes` at the same octave and length.
    pub fn uniform(notes: &[Note], octave: i32, beats: f64, tempo: f64) -> Self {
        Self::new(
            notes
                .iter()
                .map(|&note| MelodyNote::new(note, octave, beats))
                .collect(),
            tempo,
        )
    }

    pub fn notes(&self) -> &[MelodyNote] {
        &self.notes
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Seconds per beat
    pub fn beat_duration(&self) -> f64 {
        60.0 / self.tempo
    }

    /// Length in seconds
    pub fn total_duration(&self) -> f64 {
        self.notes.iter().map(|n| n.beats).sum::<f64>() * self.beat_duration()
    }

    pub fn pitches(&self) -> Vec<Note> {
        self.notes.iter().map(|n| n.note).collect()
    }
}
