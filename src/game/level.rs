use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{ChallengeSettings, MelodySettings};
use crate::theory::{Melody, Note};

/// How hard one round is: how many notes are on offer and how many the
/// player must reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfiguration {
    pub grid_size: usize,
    pub melody_length: usize,
    /// 1-based catalog position; 0 for challenge rounds
    pub level_number: u32,
    /// Consecutive correct answers needed to clear the level; `None` never clears
    pub streak_to_win: Option<u32>,
}

const STREAK_TO_WIN: u32 = 5;

const fn level(grid_size: usize, melody_length: usize, level_number: u32) -> LevelConfiguration {
    LevelConfiguration {
        grid_size,
        melody_length,
        level_number,
        streak_to_win: Some(STREAK_TO_WIN),
    }
}

static CATALOG: [LevelConfiguration; 21] = [
    level(2, 2, 1),
    level(3, 2, 2),
    level(3, 3, 3),
    level(4, 2, 4),
    level(4, 3, 5),
    level(4, 4, 6),
    level(5, 3, 7),
    level(5, 4, 8),
    level(5, 5, 9),
    level(6, 3, 10),
    level(6, 4, 11),
    level(6, 5, 12),
    level(6, 6, 13),
    level(7, 4, 14),
    level(7, 5, 15),
    level(7, 6, 16),
    level(8, 5, 17),
    level(8, 6, 18),
    level(9, 5, 19),
    level(9, 6, 20),
    level(9, 7, 21),
];

impl LevelConfiguration {
    /// Every practice level, easiest first.
    pub fn catalog() -> &'static [LevelConfiguration] {
        &CATALOG
    }

    pub fn by_number(level_number: u32) -> Option<LevelConfiguration> {
        let index = (level_number as usize).checked_sub(1)?;
        CATALOG.get(index).copied()
    }

    /// An endless challenge round of the given length.
    pub fn challenge(grid_size: usize, melody_length: usize) -> Self {
        Self {
            grid_size,
            melody_length,
            level_number: 0,
            streak_to_win: None,
        }
    }

    /// Challenge round with a length drawn from the configured range.
    pub fn random_challenge<R: Rng + ?Sized>(settings: &ChallengeSettings, rng: &mut R) -> Self {
        let length = rng.gen_range(settings.length_range());
        Self::challenge(settings.grid_size, length)
    }

    pub fn is_challenge(&self) -> bool {
        self.streak_to_win.is_none()
    }

    /// The following catalog level, if there is one.
    pub fn next(&self) -> Option<LevelConfiguration> {
        if self.is_challenge() {
            return None;
        }
        Self::by_number(self.level_number + 1)
    }
}

/// One generated round. Built fresh each round, never edited.
#[derive(Debug, Clone, PartialEq)]
pub struct GameLevel {
    pub configuration: LevelConfiguration,
    /// The note buttons offered this round, distinct
    pub available_notes: Vec<Note>,
    pub melody: Melody,
    pub target_notes: Vec<Note>,
}

impl GameLevel {
    /// Picks `grid_size` distinct notes, then samples `melody_length` of them
    /// with replacement.
    pub fn generate<R: Rng + ?Sized>(
        configuration: LevelConfiguration,
        shape: &MelodySettings,
        rng: &mut R,
    ) -> Self {
        let grid_size = configuration.grid_size.clamp(1, Note::ALL.len());
        let mut pool = Note::ALL.to_vec();
        pool.shuffle(&mut *rng);
        pool.truncate(grid_size);

        let target_notes: Vec<Note> = (0..configuration.melody_length)
            .filter_map(|_| pool.choose(&mut *rng).copied())
            .collect();
        let melody = Melody::uniform(&target_notes, shape.octave, shape.note_beats, shape.tempo);

        Self {
            configuration,
            available_notes: pool,
            melody,
            target_notes,
        }
    }
}
