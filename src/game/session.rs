use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use tracing::{debug, info};

use super::{GameLevel, LevelConfiguration, Progress};
use crate::config::Settings;
use crate::events::{PlaybackStatus, SessionUpdate};
use crate::service::SoundService;
use crate::theory::{Melody, Note};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Auditioning the target melody
    Listening,
    /// Filling answer slots
    Playing,
    /// Answer checked, feedback shown
    Result,
    /// Streak target reached (practice only)
    LevelComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// Replays one catalog level until its streak target is reached.
    Practice(LevelConfiguration),
    /// Endless rounds of random length; tracks a best streak.
    Challenge,
}

/// One player's run through a level or the challenge.
///
/// All mutation goes through these methods, each of which publishes a
/// [`SessionUpdate`] to subscribers. Playback is delegated to a
/// [`SoundService`]; answer checking never depends on playback state.
pub struct GameSession {
    mode: GameMode,
    settings: Settings,
    sound: Arc<dyn SoundService>,
    progress: Progress,
    rng: Pcg32,
    level: GameLevel,
    phase: GamePhase,
    selected_note: Option<Note>,
    answer: Vec<Option<Note>>,
    feedback: Vec<bool>,
    correct_streak: u32,
    has_listened: bool,
    is_complete: bool,
    is_level_won: bool,
    playing_note_index: Option<usize>,
    subscribers: Vec<Sender<SessionUpdate>>,
}

impl GameSession {
    pub fn new(
        mode: GameMode,
        settings: Settings,
        sound: Arc<dyn SoundService>,
        progress: Progress,
    ) -> Self {
        Self::with_seed(mode, settings, sound, progress, rand::random())
    }

    /// Like [`new`](Self::new) with reproducible level generation.
    pub fn with_seed(
        mode: GameMode,
        settings: Settings,
        sound: Arc<dyn SoundService>,
        progress: Progress,
        seed: u64,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let configuration = round_configuration(mode, &settings, &mut rng);
        let level = GameLevel::generate(configuration, &settings.melody, &mut rng);
        info!(
            level = configuration.level_number,
            grid = configuration.grid_size,
            length = configuration.melody_length,
            "session started"
        );

        Self {
            mode,
            settings,
            sound,
            progress,
            rng,
            answer: vec![None; level.target_notes.len()],
            level,
            phase: GamePhase::Listening,
            selected_note: None,
            feedback: Vec::new(),
            correct_streak: 0,
            has_listened: false,
            is_complete: false,
            is_level_won: false,
            playing_note_index: None,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<SessionUpdate> {
        let (tx, rx) = crossbeam::channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, update: SessionUpdate) {
        self.subscribers.retain(|tx| tx.send(update.clone()).is_ok());
    }

    fn set_phase(&mut self, phase: GamePhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "phase change");
            self.phase = phase;
            self.publish(SessionUpdate::Phase(phase));
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn is_challenge(&self) -> bool {
        matches!(self.mode, GameMode::Challenge)
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn level(&self) -> &GameLevel {
        &self.level
    }

    /// Configuration of the current round.
    pub fn configuration(&self) -> LevelConfiguration {
        self.level.configuration
    }

    /// The note grid for this round.
    pub fn available_notes(&self) -> &[Note] {
        &self.level.available_notes
    }

    pub fn answer(&self) -> &[Option<Note>] {
        &self.answer
    }

    pub fn is_answer_complete(&self) -> bool {
        self.answer.iter().all(Option::is_some)
    }

    /// Per-slot correctness of the last checked answer.
    pub fn feedback(&self) -> &[bool] {
        &self.feedback
    }

    pub fn selected_note(&self) -> Option<Note> {
        self.selected_note
    }

    pub fn correct_streak(&self) -> u32 {
        self.correct_streak
    }

    pub fn has_listened_to_melody(&self) -> bool {
        self.has_listened
    }

    /// Whether the last checked answer was fully correct.
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn is_level_won(&self) -> bool {
        self.is_level_won
    }

    pub fn playing_note_index(&self) -> Option<usize> {
        self.playing_note_index
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn challenge_best_streak(&self) -> u32 {
        self.progress.challenge_best_streak()
    }

    /// Plays the melody to reproduce. Counts as listening as soon as it is
    /// issued.
    pub fn play_target_melody(&mut self) {
        if !self.has_listened {
            self.has_listened = true;
            self.publish(SessionUpdate::Listened(true));
        }
        self.sound
            .play_melody(&self.level.melody, self.settings.audio.note_volume);
    }

    /// Plays back the filled answer slots, skipping empty ones.
    pub fn play_user_melody(&mut self) {
        let notes: Vec<Note> = self.answer.iter().flatten().copied().collect();
        if notes.is_empty() {
            return;
        }
        let shape = &self.settings.melody;
        let melody = Melody::uniform(&notes, shape.octave, shape.note_beats, shape.tempo);
        self.sound.play_melody(&melody, self.settings.audio.note_volume);
    }

    pub fn stop_playback(&mut self) {
        self.sound.stop_all();
        self.sync_playback();
    }

    /// Pulls playback flags from the sound service and republishes the
    /// sounding note index if it moved.
    pub fn sync_playback(&mut self) -> PlaybackStatus {
        let status = self.sound.status();
        if status.now_playing != self.playing_note_index {
            self.playing_note_index = status.now_playing;
            self.publish(SessionUpdate::NowPlaying(status.now_playing));
        }
        status
    }

    /// Listening -> Playing, once the melody has been heard.
    pub fn start_playing(&mut self) -> bool {
        if self.phase != GamePhase::Listening || !self.has_listened {
            return false;
        }
        self.set_phase(GamePhase::Playing);
        true
    }

    /// Picks a note from the grid and auditions it.
    pub fn select_note(&mut self, note: Note) {
        if self.phase != GamePhase::Playing || !self.level.available_notes.contains(&note) {
            return;
        }
        self.selected_note = Some(note);
        self.publish(SessionUpdate::Selected(Some(note)));
        self.sound.play_note(
            note,
            self.settings.melody.octave,
            self.settings.audition.note_seconds,
            self.settings.audio.note_volume,
        );
    }

    /// Writes the selected note into `slot`, replacing what was there.
    pub fn place_selected_note(&mut self, slot: usize) {
        if self.phase != GamePhase::Playing {
            return;
        }
        let Some(note) = self.selected_note else {
            return;
        };
        let Some(entry) = self.answer.get_mut(slot) else {
            return;
        };
        *entry = Some(note);
        let answer = self.answer.clone();
        self.publish(SessionUpdate::Answer(answer));
    }

    /// Scores a full answer. Returns whether it was correct, or `None` when
    /// nothing was checked (wrong phase or an empty slot).
    pub fn check_answer(&mut self) -> Option<bool> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        let submitted = self.answer.iter().copied().collect::<Option<Vec<Note>>>()?;

        self.feedback = submitted
            .iter()
            .zip(&self.level.target_notes)
            .map(|(given, target)| given == target)
            .collect();
        let correct = self.feedback.iter().all(|&ok| ok);
        let feedback = self.feedback.clone();
        self.publish(SessionUpdate::Feedback(feedback));

        self.is_complete = correct;
        if !correct {
            self.correct_streak = 0;
            self.publish(SessionUpdate::Streak(0));
            self.set_phase(GamePhase::Result);
            return Some(false);
        }

        self.correct_streak += 1;
        self.publish(SessionUpdate::Streak(self.correct_streak));
        debug!(streak = self.correct_streak, "correct answer");

        match self.mode {
            GameMode::Practice(configuration) => {
                let won = configuration
                    .streak_to_win
                    .is_some_and(|target| self.correct_streak >= target);
                if won {
                    self.is_level_won = true;
                    if let Some(next) = configuration.next() {
                        if self.progress.unlock(next.level_number) {
                            self.publish(SessionUpdate::LevelUnlocked(next.level_number));
                        }
                    }
                    self.set_phase(GamePhase::LevelComplete);
                    return Some(true);
                }
            }
            GameMode::Challenge => {
                if self.progress.record_challenge_streak(self.correct_streak) {
                    self.publish(SessionUpdate::BestStreak(self.correct_streak));
                }
            }
        }

        self.set_phase(GamePhase::Result);
        Some(true)
    }

    /// Starts a fresh round: new level, empty slots, back to Listening.
    /// The streak carries over.
    pub fn next_level(&mut self) {
        let configuration = round_configuration(self.mode, &self.settings, &mut self.rng);
        self.level = GameLevel::generate(configuration, &self.settings.melody, &mut self.rng);
        self.answer = vec![None; self.level.target_notes.len()];
        self.selected_note = None;
        self.feedback.clear();
        self.is_complete = false;
        self.is_level_won = false;
        self.has_listened = false;

        self.publish(SessionUpdate::LevelGenerated {
            available: self.level.available_notes.clone(),
            melody_length: self.level.target_notes.len(),
        });
        self.set_phase(GamePhase::Listening);
    }
}

fn round_configuration(mode: GameMode, settings: &Settings, rng: &mut Pcg32) -> LevelConfiguration {
    match mode {
        GameMode::Practice(configuration) => configuration,
        GameMode::Challenge => LevelConfiguration::random_challenge(&settings.challenge, rng),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::service::{MockSoundService, SoundCall};
    use crate::store::MemoryStore;

    fn fast_settings() -> Settings {
        let mut settings = Settings::default();
        // 5 ms per note keeps melody threads short
        settings.melody.tempo = 6000.0;
        settings
    }

    fn session(mode: GameMode) -> (GameSession, MockSoundService) {
        let mock = MockSoundService::new();
        let session = GameSession::with_seed(
            mode,
            fast_settings(),
            Arc::new(mock.clone()),
            Progress::new(Box::new(MemoryStore::new())),
            42,
        );
        (session, mock)
    }

    fn first_level() -> GameMode {
        GameMode::Practice(LevelConfiguration::by_number(1).unwrap())
    }

    fn fill(session: &mut GameSession, notes: &[Note]) {
        for (slot, note) in notes.iter().enumerate() {
            session.select_note(*note);
            session.place_selected_note(slot);
        }
    }

    fn play_round(session: &mut GameSession, correct: bool) -> Option<bool> {
        session.play_target_melody();
        assert!(session.start_playing());
        let mut notes = session.level().target_notes.clone();
        if !correct {
            let wrong = session
                .available_notes()
                .iter()
                .copied()
                .find(|n| *n != notes[0])
                .unwrap();
            notes[0] = wrong;
        }
        fill(session, &notes);
        session.check_answer()
    }

    #[test]
    fn starts_listening_with_empty_slots() {
        let (session, _) = session(first_level());
        assert_eq!(session.phase(), GamePhase::Listening);
        assert_eq!(session.answer(), &[None, None]);
        assert_eq!(session.available_notes().len(), 2);
        assert!(!session.has_listened_to_melody());
        assert_eq!(session.correct_streak(), 0);
    }

    #[test]
    fn must_listen_before_playing() {
        let (mut session, mock) = session(first_level());
        assert!(!session.start_playing());
        assert_eq!(session.phase(), GamePhase::Listening);

        session.play_target_melody();
        assert!(session.has_listened_to_melody());
        assert!(
            mock.calls()
                .iter()
                .any(|call| matches!(call, SoundCall::Melody { .. }))
        );
        assert!(session.start_playing());
        assert_eq!(session.phase(), GamePhase::Playing);
        assert!(!session.start_playing());
    }

    #[test]
    fn selecting_auditions_the_note() {
        let (mut session, mock) = session(first_level());
        session.play_target_melody();
        session.start_playing();
        session.stop_playback();
        mock.clear();

        let note = session.available_notes()[1];
        session.select_note(note);
        assert_eq!(session.selected_note(), Some(note));
        assert_eq!(
            mock.calls(),
            vec![SoundCall::Note {
                note,
                octave: 4,
                duration: 0.3,
                volume: 0.5,
            }]
        );
    }

    #[test]
    fn ignores_notes_outside_the_grid_and_bad_slots() {
        let (mut session, _) = session(first_level());
        session.play_target_melody();
        session.start_playing();

        let outside = Note::ALL
            .into_iter()
            .find(|n| !session.available_notes().contains(n))
            .unwrap();
        session.select_note(outside);
        assert_eq!(session.selected_note(), None);
        session.place_selected_note(0);
        assert_eq!(session.answer(), &[None, None]);

        let inside = session.available_notes()[0];
        session.select_note(inside);
        session.place_selected_note(5);
        assert_eq!(session.answer(), &[None, None]);
    }

    #[test]
    fn slots_can_be_overwritten() {
        let (mut session, _) = session(first_level());
        session.play_target_melody();
        session.start_playing();
        let pool = session.available_notes().to_vec();

        session.select_note(pool[0]);
        session.place_selected_note(1);
        session.select_note(pool[1]);
        session.place_selected_note(1);
        assert_eq!(session.answer(), &[None, Some(pool[1])]);
    }

    #[test]
    fn incomplete_answer_is_not_checked() {
        let (mut session, _) = session(first_level());
        session.play_target_melody();
        session.start_playing();
        let note = session.available_notes()[0];
        session.select_note(note);
        session.place_selected_note(0);

        assert_eq!(session.check_answer(), None);
        assert_eq!(session.phase(), GamePhase::Playing);
        assert!(session.feedback().is_empty());
    }

    #[test]
    fn cannot_answer_while_listening() {
        let (mut session, _) = session(first_level());
        session.select_note(session.available_notes()[0]);
        session.place_selected_note(0);
        assert_eq!(session.answer(), &[None, None]);
        assert_eq!(session.check_answer(), None);
    }

    #[test]
    fn correct_answer_scores() {
        let (mut session, _) = session(first_level());
        assert_eq!(play_round(&mut session, true), Some(true));
        assert_eq!(session.feedback(), &[true, true]);
        assert_eq!(session.correct_streak(), 1);
        assert!(session.is_complete());
        assert_eq!(session.phase(), GamePhase::Result);

        // Result is computed once
        assert_eq!(session.check_answer(), None);
        assert_eq!(session.correct_streak(), 1);
    }

    #[test]
    fn wrong_answer_resets_streak() {
        let (mut session, _) = session(first_level());
        play_round(&mut session, true);
        session.next_level();
        play_round(&mut session, true);
        session.next_level();
        assert_eq!(session.correct_streak(), 2);

        assert_eq!(play_round(&mut session, false), Some(false));
        assert!(session.feedback().contains(&false));
        assert_eq!(session.correct_streak(), 0);
        assert!(!session.is_complete());
        assert_eq!(session.phase(), GamePhase::Result);
    }

    #[test]
    fn next_level_resets_round_state() {
        let (mut session, _) = session(first_level());
        play_round(&mut session, true);
        session.next_level();

        assert_eq!(session.phase(), GamePhase::Listening);
        assert_eq!(session.answer(), &[None, None]);
        assert!(session.feedback().is_empty());
        assert!(!session.has_listened_to_melody());
        assert_eq!(session.selected_note(), None);
        assert_eq!(session.correct_streak(), 1);
    }

    #[test]
    fn five_correct_rounds_clear_the_first_level() {
        let (mut session, _) = session(first_level());
        for round in 1..=5 {
            assert_eq!(play_round(&mut session, true), Some(true));
            if round < 5 {
                assert_eq!(session.phase(), GamePhase::Result);
                assert!(!session.progress().is_unlocked(2));
                session.next_level();
            }
        }
        assert_eq!(session.phase(), GamePhase::LevelComplete);
        assert!(session.is_level_won());
        assert_eq!(session.progress().unlocked_levels(), BTreeSet::from([1, 2]));

        session.next_level();
        assert_eq!(session.phase(), GamePhase::Listening);
        assert_eq!(session.configuration().level_number, 1);
    }

    #[test]
    fn last_level_unlocks_nothing() {
        let (mut session, _) = session(GameMode::Practice(
            LevelConfiguration::by_number(21).unwrap(),
        ));
        for _ in 0..5 {
            play_round(&mut session, true);
            if session.phase() != GamePhase::LevelComplete {
                session.next_level();
            }
        }
        assert_eq!(session.phase(), GamePhase::LevelComplete);
        assert_eq!(session.progress().unlocked_levels(), BTreeSet::from([1]));
    }

    #[test]
    fn challenge_tracks_best_and_never_completes() {
        let (mut session, _) = session(GameMode::Challenge);
        for _ in 0..3 {
            assert!((4..=7).contains(&session.answer().len()));
            assert_eq!(play_round(&mut session, true), Some(true));
            assert_eq!(session.phase(), GamePhase::Result);
            session.next_level();
        }
        assert_eq!(session.correct_streak(), 3);
        assert_eq!(session.challenge_best_streak(), 3);

        assert_eq!(play_round(&mut session, false), Some(false));
        assert_eq!(session.correct_streak(), 0);
        assert_eq!(session.challenge_best_streak(), 3);
        assert_eq!(session.configuration().streak_to_win, None);
    }

    #[test]
    fn challenge_best_is_not_lowered() {
        let mut store = MemoryStore::new();
        crate::store::save_value(&mut store, crate::game::CHALLENGE_BEST_STREAK_KEY, &10u32)
            .unwrap();
        let mock = MockSoundService::new();
        let mut session = GameSession::with_seed(
            GameMode::Challenge,
            fast_settings(),
            Arc::new(mock),
            Progress::new(Box::new(store)),
            9,
        );
        for _ in 0..3 {
            play_round(&mut session, true);
            session.next_level();
        }
        play_round(&mut session, false);
        assert_eq!(session.challenge_best_streak(), 10);
    }

    #[test]
    fn replays_user_answer() {
        let (mut session, mock) = session(first_level());
        session.play_user_melody();
        assert!(mock.calls().is_empty());

        session.play_target_melody();
        session.start_playing();
        let note = session.available_notes()[0];
        session.select_note(note);
        session.place_selected_note(1);
        session.play_user_melody();

        let melodies: Vec<Vec<Note>> = mock
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                SoundCall::Melody { notes, .. } => Some(notes),
                _ => None,
            })
            .collect();
        assert_eq!(melodies.last(), Some(&vec![note]));
    }

    #[test]
    fn publishes_updates() {
        let (mut session, _) = session(first_level());
        let updates = session.subscribe();
        play_round(&mut session, true);

        let received: Vec<SessionUpdate> = updates.try_iter().collect();
        assert_eq!(received.first(), Some(&SessionUpdate::Listened(true)));
        assert!(received.contains(&SessionUpdate::Phase(GamePhase::Playing)));
        assert!(received.contains(&SessionUpdate::Feedback(vec![true, true])));
        assert!(received.contains(&SessionUpdate::Streak(1)));
        assert_eq!(received.last(), Some(&SessionUpdate::Phase(GamePhase::Result)));

        drop(updates);
        session.next_level();
        assert!(session.subscribers.is_empty());
    }

    #[test]
    fn playback_index_clears_when_the_melody_ends() {
        let (mut session, _) = session(first_level());
        session.play_target_melody();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            let status = session.sync_playback();
            if !status.is_melody_playing {
                break;
            }
            assert!(std::time::Instant::now() < deadline);
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(session.playing_note_index(), None);
    }
}
