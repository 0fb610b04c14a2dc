use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::CancellationToken;
use crate::events::{MelodyEvent, PlaybackUpdate, SequenceId};
use crate::service::NotePlayer;
use crate::theory::Melody;

struct ActiveSequence {
    id: SequenceId,
    token: CancellationToken,
}

/// Plays melodies note by note on a background thread. At most one sequence
/// is live; starting another cancels it.
pub struct MelodyScheduler {
    active: Mutex<Option<ActiveSequence>>,
    next_id: AtomicU64,
    update_tx: Sender<PlaybackUpdate>,
}

impl MelodyScheduler {
    pub fn new(update_tx: Sender<PlaybackUpdate>) -> Self {
        Self {
            active: Mutex::new(None),
            next_id: AtomicU64::new(0),
            update_tx,
        }
    }

    /// Cancels the live sequence (if any) and starts `melody` through `player`.
    /// Returns immediately.
    pub fn start<P>(&self, melody: Melody, player: P, volume: f32) -> SequenceId
    where
        P: NotePlayer + 'static,
    {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.token.cancel();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        let _ = self.update_tx.send(PlaybackUpdate::Melody {
            sequence: id,
            event: MelodyEvent::Started,
        });
        *active = Some(ActiveSequence {
            id,
            token: token.clone(),
        });
        drop(active);

        let update_tx = self.update_tx.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("earstreak-melody-{id}"))
            .spawn(move || run_sequence(id, &melody, &player, volume, &token, &update_tx));

        if let Err(e) = spawned {
            warn!(sequence = id, "failed to spawn melody thread: {}", e);
            let _ = self.update_tx.send(PlaybackUpdate::Melody {
                sequence: id,
                event: MelodyEvent::Finished,
            });
        }
        id
    }

    /// Invalidates the live sequence. Once this returns, no further note of
    /// it will start.
    pub fn cancel(&self) -> Option<SequenceId> {
        let active = self.active.lock().take()?;
        active.token.cancel();
        debug!(sequence = active.id, "melody cancelled");
        Some(active.id)
    }

    pub fn current(&self) -> Option<SequenceId> {
        self.active.lock().as_ref().map(|a| a.id)
    }
}

fn run_sequence<P: NotePlayer>(
    id: SequenceId,
    melody: &Melody,
    player: &P,
    volume: f32,
    token: &CancellationToken,
    update_tx: &Sender<PlaybackUpdate>,
) {
    let beat = melody.beat_duration();
    debug!(sequence = id, notes = melody.len(), tempo = melody.tempo(), "melody started");

    for (index, entry) in melody.notes().iter().enumerate() {
        let seconds = beat * entry.beats;
        let started = token.run_unless_cancelled(|| {
            let _ = update_tx.send(PlaybackUpdate::Melody {
                sequence: id,
                event: MelodyEvent::NowPlaying { index },
            });
            player.play_note(entry.note, entry.octave, seconds, volume);
        });
        if started.is_none() {
            break;
        }
        // Pacing comes from this wait, not from the voice finishing.
        let wait = Duration::try_from_secs_f64(seconds).unwrap_or_default();
        if !token.sleep(wait) {
            break;
        }
    }

    let _ = update_tx.send(PlaybackUpdate::Melody {
        sequence: id,
        event: MelodyEvent::Finished,
    });
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::events::StatusTracker;
    use crate::service::{MockSoundService, SoundCall};
    use crate::theory::{MelodyNote, Note};

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn notes_played(mock: &MockSoundService) -> Vec<(Note, f64)> {
        mock.calls()
            .into_iter()
            .filter_map(|call| match call {
                SoundCall::Note { note, duration, .. } => Some((note, duration)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn plays_every_note_in_order() {
        let (tx, tracker) = StatusTracker::new();
        let scheduler = MelodyScheduler::new(tx);
        let mock = MockSoundService::new();

        // 6000 bpm = 10 ms per beat
        let melody = Melody::new(
            vec![
                MelodyNote::new(Note::C, 4, 1.0),
                MelodyNote::new(Note::E, 4, 2.0),
                MelodyNote::new(Note::G, 5, 0.5),
            ],
            6000.0,
        );
        let start = Instant::now();
        scheduler.start(melody, mock.clone(), 0.5);

        wait_for(|| !tracker.refresh(false).is_melody_playing);
        assert!(start.elapsed() >= Duration::from_millis(35));

        let played = notes_played(&mock);
        let pitches: Vec<Note> = played.iter().map(|(n, _)| *n).collect();
        assert_eq!(pitches, vec![Note::C, Note::E, Note::G]);
        assert!((played[1].1 - 0.02).abs() < 1e-9);
        assert_eq!(tracker.snapshot().now_playing, None);
    }

    #[test]
    fn publishes_index_before_each_note() {
        let (tx, tracker) = StatusTracker::new();
        let scheduler = MelodyScheduler::new(tx);
        let mock = MockSoundService::new();
        let melody = Melody::uniform(&[Note::A; 3], 4, 1.0, 300.0);
        scheduler.start(melody, mock.clone(), 0.5);

        wait_for(|| mock.calls().len() == 1);
        assert_eq!(tracker.refresh(false).now_playing, Some(0));
        scheduler.cancel();
    }

    #[test]
    fn cancel_stops_before_next_note() {
        let (tx, _tracker) = StatusTracker::new();
        let scheduler = MelodyScheduler::new(tx);
        let mock = MockSoundService::new();
        let melody = Melody::uniform(&[Note::D; 10], 4, 1.0, 600.0);
        scheduler.start(melody, mock.clone(), 0.5);

        wait_for(|| !mock.calls().is_empty());
        assert!(scheduler.cancel().is_some());
        let count = mock.calls().len();
        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(mock.calls().len(), count);
        assert!(scheduler.cancel().is_none());
    }

    #[test]
    fn second_melody_supersedes_first() {
        let (tx, tracker) = StatusTracker::new();
        let scheduler = MelodyScheduler::new(tx);
        let mock = MockSoundService::new();

        let first = Melody::uniform(&[Note::C; 20], 4, 1.0, 1200.0);
        let second = Melody::uniform(&[Note::G; 3], 4, 1.0, 1200.0);

        let first_id = scheduler.start(first, mock.clone(), 0.5);
        wait_for(|| mock.calls().len() >= 2);
        let second_id = scheduler.start(second, mock.clone(), 0.5);
        assert!(second_id > first_id);
        assert_eq!(scheduler.current(), Some(second_id));

        wait_for(|| !tracker.refresh(false).is_melody_playing);
        std::thread::sleep(Duration::from_millis(100));

        let pitches: Vec<Note> = notes_played(&mock).into_iter().map(|(n, _)| n).collect();
        let first_g = pitches.iter().position(|n| *n == Note::G).unwrap();
        assert!(pitches[first_g..].iter().all(|n| *n == Note::G));
        assert_eq!(pitches[first_g..].len(), 3);
    }

    #[test]
    fn empty_melody_finishes_immediately() {
        let (tx, tracker) = StatusTracker::new();
        let scheduler = MelodyScheduler::new(tx);
        let mock = MockSoundService::new();
        scheduler.start(Melody::new(Vec::new(), 120.0), mock.clone(), 0.5);

        wait_for(|| !tracker.refresh(false).is_melody_playing);
        assert!(mock.calls().is_empty());
    }
}
