use super::ToneBuffer;

pub type VoiceId = u64;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Playback state of one triggered tone.
#[derive(Debug, Clone)]
pub struct Voice {
    pub id: VoiceId,
    buffer: ToneBuffer,
    pos: f64,
}

impl Voice {
    pub fn new(id: VoiceId, buffer: ToneBuffer) -> Self {
        Self { id, buffer, pos: 0.0 }
    }

    pub fn is_finished(&self) -> bool {
        self.pos >= self.buffer.len() as f64
    }

    /// Adds this voice into interleaved `out` (same sample on every channel),
    /// reading the buffer at `output_rate`. Returns true once the buffer is
    /// exhausted.
    pub fn mix_into(&mut self, out: &mut [f32], channels: usize, output_rate: u32, gain: f32) -> bool {
        let channels = channels.max(1);
        let step = self.buffer.sample_rate() as f64 / output_rate.max(1) as f64;
        let data = self.buffer.samples();

        for frame in out.chunks_mut(channels) {
            if self.is_finished() {
                break;
            }
            let i = self.pos as usize;
            let frac = (self.pos - i as f64) as f32;
            let s0 = data[i];
            let s1 = data.get(i + 1).copied().unwrap_or(s0);
            let sample = lerp(s0, s1, frac) * gain;

            for out_sample in frame.iter_mut() {
                *out_sample += sample;
            }
            self.pos += step;
        }

        self.is_finished()
    }
}
