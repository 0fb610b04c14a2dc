use std::fmt;

use serde::{Deserialize, Serialize};

use super::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordType {
    Major,
    Minor,
    Diminished,
    Augmented,
    Major7,
    Minor7,
    Dominant7,
}

impl ChordType {
    pub const ALL: [ChordType; 7] = [
        ChordType::Major,
        ChordType::Minor,
        ChordType::Diminished,
        ChordType::Augmented,
        ChordType::Major7,
        ChordType::Minor7,
        ChordType::Dominant7,
    ];

    /// Semitone offsets from the root, root first.
    pub fn intervals(self) -> &'static [usize] {
        match self {
            ChordType::Major => &[0, 4, 7],
            ChordType::Minor => &[0, 3, 7],
            ChordType::Diminished => &[0, 3, 6],
            ChordType::Augmented => &[0, 4, 8],
            ChordType::Major7 => &[0, 4, 7, 11],
            ChordType::Minor7 => &[0, 3, 7, 10],
            ChordType::Dominant7 => &[0, 4, 7, 10],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChordType::Major => "Major",
            ChordType::Minor => "Minor",
            ChordType::Diminished => "Diminished",
            ChordType::Augmented => "Augmented",
            ChordType::Major7 => "Major 7th",
            ChordType::Minor7 => "Minor 7th",
            ChordType::Dominant7 => "Dominant 7th",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chord {
    pub root: Note,
    pub kind: ChordType,
    pub octave: i32,
}

impl Chord {
    pub fn new(root: Note, kind: ChordType, octave: i32) -> Self {
        Self { root, kind, octave }
    }

    /// Chord tones in interval order. Tones wrap into the root's pitch-class
    /// range, so every tone shares the chord's octave.
    pub fn notes(&self) -> Vec<Note> {
        self.kind
            .intervals()
            .iter()
            .map(|&interval| self.root.transpose(interval))
            .collect()
    }

    pub fn frequencies(&self) -> Vec<f64> {
        self.notes()
            .into_iter()
            .map(|note| note.frequency(self.octave))
            .collect()
    }

    /// "C# Minor 7th". Octave is not part of the name.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.root.label(), self.kind.label())
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
