mod output;
mod tone;
mod voice;

pub use output::{spawn_output, OutputHandle};
pub use tone::{synthesize, ToneBuffer, DECAY_SECONDS, MAX_TONE_SECONDS, SAMPLE_RATE};
pub use voice::{Voice, VoiceId};
