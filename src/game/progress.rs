use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::store::{load_value, save_value, KeyValueStore};

pub const UNLOCKED_LEVELS_KEY: &str = "unlockedLevels";
pub const CHALLENGE_BEST_STREAK_KEY: &str = "challengeBestStreak";

/// Player progress kept in a [`KeyValueStore`]. Reads never fail: absent or
/// corrupt data yields the defaults (level 1 unlocked, best streak 0).
pub struct Progress {
    store: Box<dyn KeyValueStore>,
}

impl Progress {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn unlocked_levels(&self) -> BTreeSet<u32> {
        load_value::<BTreeSet<u32>>(self.store.as_ref(), UNLOCKED_LEVELS_KEY)
            .filter(|levels| !levels.is_empty())
            .unwrap_or_else(|| BTreeSet::from([1]))
    }

    pub fn is_unlocked(&self, level_number: u32) -> bool {
        self.unlocked_levels().contains(&level_number)
    }

    pub fn highest_unlocked(&self) -> u32 {
        self.unlocked_levels().last().copied().unwrap_or(1)
    }

    /// Returns true if the level was newly unlocked.
    pub fn unlock(&mut self, level_number: u32) -> bool {
        let mut levels = self.unlocked_levels();
        if !levels.insert(level_number) {
            return false;
        }
        if let Err(e) = save_value(self.store.as_mut(), UNLOCKED_LEVELS_KEY, &levels) {
            warn!(level_number, "failed to save unlocked levels: {}", e);
        }
        info!(level_number, "level unlocked");
        true
    }

    pub fn challenge_best_streak(&self) -> u32 {
        load_value(self.store.as_ref(), CHALLENGE_BEST_STREAK_KEY).unwrap_or(0)
    }

    /// Stores `streak` if it beats the current best. Returns true when stored.
    pub fn record_challenge_streak(&mut self, streak: u32) -> bool {
        if streak <= self.challenge_best_streak() {
            return false;
        }
        if let Err(e) = save_value(self.store.as_mut(), CHALLENGE_BEST_STREAK_KEY, &streak) {
            warn!(streak, "failed to save challenge best streak: {}", e);
        }
        true
    }
}
