use crossbeam::channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::game::GamePhase;
use crate::theory::Note;

pub type SequenceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MelodyEvent {
    Started,
    NowPlaying { index: usize },
    Finished,
}

/// Sent from sequencing threads; applied on the foreground by [`StatusTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackUpdate {
    Melody {
        sequence: SequenceId,
        event: MelodyEvent,
    },
}

/// Flags the UI reads to gate input and highlight the sounding note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub is_playing: bool,
    pub is_melody_playing: bool,
    pub now_playing: Option<usize>,
}

#[derive(Debug, Default)]
struct TrackerState {
    status: PlaybackStatus,
    current: Option<SequenceId>,
}

/// Folds [`PlaybackUpdate`]s into a [`PlaybackStatus`]. Events from a
/// sequence other than the newest one are stale and ignored.
#[derive(Debug)]
pub struct StatusTracker {
    update_rx: Receiver<PlaybackUpdate>,
    state: Mutex<TrackerState>,
}

impl StatusTracker {
    pub fn new() -> (Sender<PlaybackUpdate>, Self) {
        let (update_tx, update_rx) = crossbeam::channel::unbounded();
        let tracker = Self {
            update_rx,
            state: Mutex::new(TrackerState::default()),
        };
        (update_tx, tracker)
    }

    /// Drains pending updates. `voices_active` is the voice count read after
    /// the last set mutation committed.
    pub fn refresh(&self, voices_active: bool) -> PlaybackStatus {
        let mut state = self.state.lock();
        while let Ok(update) = self.update_rx.try_recv() {
            match update {
                PlaybackUpdate::Melody { sequence, event } => apply(&mut state, sequence, event),
            }
        }
        state.status.is_playing = voices_active;
        state.status
    }

    pub fn snapshot(&self) -> PlaybackStatus {
        self.state.lock().status
    }

    /// Everything stopped: drop pending updates, forget the current sequence
    /// and clear all flags.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        while self.update_rx.try_recv().is_ok() {}
        state.current = None;
        state.status = PlaybackStatus::default();
    }
}

fn apply(state: &mut TrackerState, sequence: SequenceId, event: MelodyEvent) {
    match event {
        MelodyEvent::Started => {
            state.current = Some(sequence);
            state.status.is_melody_playing = true;
            state.status.now_playing = None;
        }
        _ if state.current != Some(sequence) => {}
        MelodyEvent::NowPlaying { index } => state.status.now_playing = Some(index),
        MelodyEvent::Finished => {
            state.current = None;
            state.status.is_melody_playing = false;
            state.status.now_playing = None;
        }
    }
}

/// Change notifications published by a game session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Phase(GamePhase),
    LevelGenerated { available: Vec<Note>, melody_length: usize },
    Selected(Option<Note>),
    Answer(Vec<Option<Note>>),
    Feedback(Vec<bool>),
    Streak(u32),
    Listened(bool),
    NowPlaying(Option<usize>),
    LevelUnlocked(u32),
    BestStreak(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn melody(sequence: SequenceId, event: MelodyEvent) -> PlaybackUpdate {
        PlaybackUpdate::Melody { sequence, event }
    }

    #[test]
    fn follows_a_sequence() {
        let (tx, tracker) = StatusTracker::new();
        tx.send(melody(1, MelodyEvent::Started)).unwrap();
        tx.send(melody(1, MelodyEvent::NowPlaying { index: 2 })).unwrap();

        let status = tracker.refresh(true);
        assert!(status.is_playing);
        assert!(status.is_melody_playing);
        assert_eq!(status.now_playing, Some(2));

        tx.send(melody(1, MelodyEvent::Finished)).unwrap();
        let status = tracker.refresh(false);
        assert_eq!(status, PlaybackStatus::default());
    }

    #[test]
    fn ignores_stale_sequences() {
        let (tx, tracker) = StatusTracker::new();
        tx.send(melody(1, MelodyEvent::Started)).unwrap();
        tx.send(melody(2, MelodyEvent::Started)).unwrap();
        tx.send(melody(1, MelodyEvent::NowPlaying { index: 4 })).unwrap();
        tx.send(melody(1, MelodyEvent::Finished)).unwrap();
        tx.send(melody(2, MelodyEvent::NowPlaying { index: 0 })).unwrap();

        let status = tracker.refresh(true);
        assert!(status.is_melody_playing);
        assert_eq!(status.now_playing, Some(0));
    }

    #[test]
    fn reset_discards_undrained_start() {
        let (tx, tracker) = StatusTracker::new();
        tx.send(melody(5, MelodyEvent::Started)).unwrap();
        tracker.reset();
        assert!(!tracker.refresh(false).is_melody_playing);
    }

    #[test]
    fn reset_drops_current_sequence() {
        let (tx, tracker) = StatusTracker::new();
        tx.send(melody(3, MelodyEvent::Started)).unwrap();
        tracker.refresh(true);
        tracker.reset();

        tx.send(melody(3, MelodyEvent::NowPlaying { index: 1 })).unwrap();
        let status = tracker.refresh(false);
        assert_eq!(status, PlaybackStatus::default());
        assert_eq!(tracker.snapshot(), status);
    }
}
