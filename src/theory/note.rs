use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CONCERT_A;

/// One of the twelve chromatic pitch classes, in cyclic order from C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Note {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl Note {
    pub const ALL: [Note; 12] = [
        Note::C,
        Note::CSharp,
        Note::D,
        Note::DSharp,
        Note::E,
        Note::F,
        Note::FSharp,
        Note::G,
        Note::GSharp,
        Note::A,
        Note::ASharp,
        Note::B,
    ];

    /// Position in the chromatic scale (C=0, B=11)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wraps around, so `from_index(12)` is C again.
    pub fn from_index(index: usize) -> Note {
        Note::ALL[index % 12]
    }

    pub fn label(self) -> &'static str {
        match self {
            Note::C => "C",
            Note::CSharp => "C#",
            Note::D => "D",
            Note::DSharp => "D#",
            Note::E => "E",
            Note::F => "F",
            Note::FSharp => "F#",
            Note::G => "G",
            Note::GSharp => "G#",
            Note::A => "A",
            Note::ASharp => "A#",
            Note::B => "B",
        }
    }

    /// Equal-tempered frequency in Hz, A4 = 440 Hz. Octave is unbounded.
    pub fn frequency(self, octave: i32) -> f64 {
        let semitones = self.index() as i32 - Note::A.index() as i32 + 12 * (octave - 4);
        CONCERT_A * 2.0_f64.powf(semitones as f64 / 12.0)
    }

    /// The note `semitones` above this one, wrapping at the octave.
    pub fn transpose(self, semitones: usize) -> Note {
        Note::from_index(self.index() + semitones)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown note name '{0}'")]
pub struct ParseNoteError(pub String);

impl FromStr for Note {
    type Err = ParseNoteError;

    /// Accepts the display labels ("C#") plus lowercase and "s" spellings ("cs").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('S', "#");
        Note::ALL
            .iter()
            .copied()
            .find(|note| note.label() == normalized)
            .ok_or_else(|| ParseNoteError(s.to_string()))
    }
}
