mod chord_match;
mod level;
mod progress;
mod session;

pub use chord_match::ChordMatchGame;
pub use level::{GameLevel, LevelConfiguration};
pub use progress::{Progress, CHALLENGE_BEST_STREAK_KEY, UNLOCKED_LEVELS_KEY};
pub use session::{GameMode, GamePhase, GameSession};
