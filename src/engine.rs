use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::audio::{self, OutputHandle, ToneBuffer, Voice, VoiceId};
use crate::config::AudioSettings;
use crate::events::{PlaybackStatus, StatusTracker};
use crate::service::{NotePlayer, SoundService};
use crate::theory::{Chord, Melody, Note};
use crate::timing::MelodyScheduler;

/// Output-stage settings read by the audio callback on every block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixSettings {
    pub master_gain: f32,
}

/// Active voices, keyed by id. Shared between the trigger path and the
/// audio callback; every access goes through one mutex.
#[derive(Debug, Default)]
pub struct VoiceSet {
    voices: HashMap<VoiceId, Voice>,
}

impl VoiceSet {
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    fn insert(&mut self, voice: Voice) {
        self.voices.insert(voice.id, voice);
    }

    fn clear(&mut self) -> usize {
        let stopped = self.voices.len();
        self.voices.clear();
        stopped
    }
}

enum Backend {
    /// Rendering into a device stream.
    Device(OutputHandle),
    /// No device; the caller drives [`PlaybackEngine::render`].
    Offline,
    /// Startup failed. Every playback call is a no-op.
    Unavailable,
}

struct EngineInner {
    voices: Arc<Mutex<VoiceSet>>,
    mix: Arc<ArcSwap<MixSettings>>,
    next_voice: AtomicU64,
    scheduler: MelodyScheduler,
    tracker: StatusTracker,
    backend: Backend,
}

/// Synthesizes tones and plays them as independent voices.
///
/// Cloning is cheap; clones share the same voices and output stream.
#[derive(Clone)]
pub struct PlaybackEngine {
    inner: Arc<EngineInner>,
}

impl PlaybackEngine {
    /// Opens the default output device. If that fails the failure is logged
    /// and the engine stays silent instead of erroring.
    pub fn start(settings: &AudioSettings) -> Self {
        let voices = Arc::new(Mutex::new(VoiceSet::default()));
        let mix = Arc::new(ArcSwap::from_pointee(MixSettings {
            master_gain: settings.master_gain,
        }));

        let voices_audio = voices.clone();
        let mix_audio = mix.clone();
        let backend = match audio::spawn_output(
            settings.preferred_sample_rate,
            move |data: &mut [f32], channels, sample_rate| {
                audio_callback(data, channels, sample_rate, &voices_audio, &mix_audio);
            },
        ) {
            Ok(output) => {
                info!(
                    sample_rate = output.sample_rate,
                    channels = output.channels,
                    "playback engine started"
                );
                Backend::Device(output)
            }
            Err(e) => {
                warn!("audio engine failed to start, playback disabled: {}", e);
                Backend::Unavailable
            }
        };

        Self::with_backend(voices, mix, backend)
    }

    /// An engine with no device. Voices are only consumed by [`render`](Self::render).
    pub fn offline(settings: &AudioSettings) -> Self {
        let mix = MixSettings {
            master_gain: settings.master_gain,
        };
        Self::with_backend(
            Arc::new(Mutex::new(VoiceSet::default())),
            Arc::new(ArcSwap::from_pointee(mix)),
            Backend::Offline,
        )
    }

    /// An engine whose startup failed.
    pub fn unavailable() -> Self {
        Self::with_backend(
            Arc::new(Mutex::new(VoiceSet::default())),
            Arc::new(ArcSwap::from_pointee(MixSettings { master_gain: 1.0 })),
            Backend::Unavailable,
        )
    }

    fn with_backend(
        voices: Arc<Mutex<VoiceSet>>,
        mix: Arc<ArcSwap<MixSettings>>,
        backend: Backend,
    ) -> Self {
        let (update_tx, tracker) = StatusTracker::new();
        Self {
            inner: Arc::new(EngineInner {
                voices,
                mix,
                next_voice: AtomicU64::new(0),
                scheduler: MelodyScheduler::new(update_tx),
                tracker,
                backend,
            }),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.inner.backend, Backend::Unavailable)
    }

    /// Device sample rate, or the synthesis rate when there is no device.
    pub fn output_sample_rate(&self) -> u32 {
        match &self.inner.backend {
            Backend::Device(output) => output.sample_rate,
            _ => audio::SAMPLE_RATE,
        }
    }

    pub fn active_voices(&self) -> usize {
        self.inner.voices.lock().len()
    }

    pub fn set_master_gain(&self, gain: f32) {
        self.inner.mix.store(Arc::new(MixSettings {
            master_gain: gain.clamp(0.0, 1.0),
        }));
    }

    pub fn master_gain(&self) -> f32 {
        self.inner.mix.load().master_gain
    }

    /// Mixes active voices into `data` as the device callback would, removing
    /// voices that finish. Used by offline engines.
    pub fn render(&self, data: &mut [f32], channels: usize, sample_rate: u32) {
        audio_callback(data, channels, sample_rate, &self.inner.voices, &self.inner.mix);
    }

    fn tone(&self, frequency: f64, duration: f64, volume: f32) -> Option<ToneBuffer> {
        match audio::synthesize(frequency, duration, volume) {
            Ok(buffer) => Some(buffer),
            Err(e) => {
                warn!("cannot build tone: {}", e);
                None
            }
        }
    }

    fn start_voices(&self, buffers: Vec<ToneBuffer>) {
        if buffers.is_empty() {
            return;
        }
        let mut voices = self.inner.voices.lock();
        for buffer in buffers {
            let id = self.inner.next_voice.fetch_add(1, Ordering::Relaxed);
            voices.insert(Voice::new(id, buffer));
        }
        trace!(active = voices.len(), "voices started");
    }
}

impl NotePlayer for PlaybackEngine {
    fn play_note(&self, note: Note, octave: i32, duration: f64, volume: f32) {
        if !self.is_available() {
            return;
        }
        debug!(note = %note, octave, duration, "play note");
        if let Some(buffer) = self.tone(note.frequency(octave), duration, volume) {
            self.start_voices(vec![buffer]);
        }
    }
}

impl SoundService for PlaybackEngine {
    fn play_chord(&self, chord: &Chord, duration: f64, volume: f32) {
        if !self.is_available() {
            return;
        }
        debug!(chord = %chord, octave = chord.octave, duration, "play chord");
        let buffers = chord
            .frequencies()
            .into_iter()
            .filter_map(|frequency| self.tone(frequency, duration, volume))
            .collect();
        self.start_voices(buffers);
    }

    fn play_melody(&self, melody: &Melody, volume: f32) {
        self.stop_all();
        if !self.is_available() {
            return;
        }
        self.inner
            .scheduler
            .start(melody.clone(), self.clone(), volume);
    }

    fn stop_all(&self) {
        // Sequencing is invalidated first so no note can start mid-teardown.
        self.inner.scheduler.cancel();
        let stopped = self.inner.voices.lock().clear();
        self.inner.tracker.reset();
        if stopped > 0 {
            debug!(stopped, "stopped all voices");
        }
    }

    fn status(&self) -> PlaybackStatus {
        let voices_active = !self.inner.voices.lock().is_empty();
        self.inner.tracker.refresh(voices_active)
    }
}

fn audio_callback(
    data: &mut [f32],
    channels: usize,
    sample_rate: u32,
    voices: &Mutex<VoiceSet>,
    mix: &ArcSwap<MixSettings>,
) {
    data.fill(0.0);
    let gain = mix.load().master_gain;

    let mut voices = voices.lock();
    voices
        .voices
        .retain(|_, voice| !voice.mix_into(data, channels, sample_rate, gain));
}
