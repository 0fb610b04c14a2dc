mod chord;
mod melody;
mod note;

pub use chord::{Chord, ChordType};
pub use melody::{Melody, MelodyNote};
pub use note::{Note, ParseNoteError};

/// Pitch of A4, the tuning reference.
pub const CONCERT_A: f64 = 440.0;
