use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::debug;

use crate::config::Settings;
use crate::service::SoundService;
use crate::theory::{Chord, ChordType, Note};

const OPTION_COUNT: usize = 4;

/// Name-the-chord quiz: one chord is played, four names are offered.
pub struct ChordMatchGame {
    sound: Arc<dyn SoundService>,
    rng: Pcg32,
    chord_seconds: f64,
    chord_volume: f32,
    current: Option<Chord>,
    options: Vec<Chord>,
    score: u32,
    showing_answer: bool,
}

impl ChordMatchGame {
    pub fn new(sound: Arc<dyn SoundService>, settings: &Settings) -> Self {
        Self::with_seed(sound, settings, rand::random())
    }

    pub fn with_seed(sound: Arc<dyn SoundService>, settings: &Settings, seed: u64) -> Self {
        Self {
            sound,
            rng: Pcg32::seed_from_u64(seed),
            chord_seconds: settings.audition.chord_seconds,
            chord_volume: settings.audio.chord_volume,
            current: None,
            options: Vec::new(),
            score: 0,
            showing_answer: false,
        }
    }

    pub fn current_chord(&self) -> Option<Chord> {
        self.current
    }

    /// The offered chords in display order. Empty before the first round.
    pub fn options(&self) -> &[Chord] {
        &self.options
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_showing_answer(&self) -> bool {
        self.showing_answer
    }

    pub fn start_new_round(&mut self) {
        let octave = self.rng.gen_range(3..=5);
        let correct = random_chord(&mut self.rng, octave);
        let mut options = vec![correct];
        while options.len() < OPTION_COUNT {
            let candidate = random_chord(&mut self.rng, correct.octave);
            let name = candidate.display_name();
            if !options.iter().any(|c| c.display_name() == name) {
                options.push(candidate);
            }
        }
        options.shuffle(&mut self.rng);
        debug!(chord = %correct, "new chord round");

        self.current = Some(correct);
        self.options = options;
        self.showing_answer = false;
    }

    /// Scores `chord` against the round's chord by name and reveals the
    /// answer. Returns whether it matched, or `None` if there is no open round.
    pub fn select_chord(&mut self, chord: &Chord) -> Option<bool> {
        let current = self.current?;
        if self.showing_answer {
            return None;
        }
        let correct = chord.display_name() == current.display_name();
        if correct {
            self.score += 1;
        }
        self.showing_answer = true;
        Some(correct)
    }

    pub fn play_current_chord(&self) {
        if let Some(chord) = &self.current {
            self.play_option(chord);
        }
    }

    pub fn play_option(&self, chord: &Chord) {
        self.sound
            .play_chord(chord, self.chord_seconds, self.chord_volume);
    }
}

fn random_chord(rng: &mut Pcg32, octave: i32) -> Chord {
    let root = Note::ALL[rng.gen_range(0..Note::ALL.len())];
    let kind = ChordType::ALL[rng.gen_range(0..ChordType::ALL.len())];
    Chord::new(root, kind, octave)
}
