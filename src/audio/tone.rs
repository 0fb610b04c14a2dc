use std::f64::consts::TAU;
use std::sync::Arc;

use crate::error::{AudioError, AudioResult};

/// Rate every tone is rendered at. The output stream resamples if the
/// device runs at a different rate.
pub const SAMPLE_RATE: u32 = 44_100;

/// Time constant of the exponential decay, in seconds. Independent of the
/// requested duration, so long notes fade out well before they end.
pub const DECAY_SECONDS: f64 = 0.3;

/// Longest tone we agree to allocate.
pub const MAX_TONE_SECONDS: f64 = 60.0;

/// A rendered mono tone. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ToneBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl ToneBuffer {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0, |peak, s| peak.max(s.abs()))
    }
}

/// Renders a decaying sine tone:
/// `sin(2π·f·i/sr) · exp(-i/(sr·0.3)) · volume` for `round(sr·duration)` samples.
pub fn synthesize(frequency: f64, duration: f64, volume: f32) -> AudioResult<ToneBuffer> {
    let valid = frequency.is_finite()
        && frequency >= 0.0
        && duration.is_finite()
        && duration >= 0.0
        && (0.0..=1.0).contains(&volume);
    if !valid {
        return Err(AudioError::InvalidTone {
            frequency,
            duration,
            volume,
        });
    }

    let rate = SAMPLE_RATE as f64;
    let max = (rate * MAX_TONE_SECONDS) as usize;
    let frames = (rate * duration).round() as usize;
    if frames > max {
        return Err(AudioError::BufferTooLarge { frames, max });
    }

    let omega = TAU * frequency / rate;
    let decay = rate * DECAY_SECONDS;
    let volume = volume as f64;

    let samples: Arc<[f32]> = (0..frames)
        .map(|i| {
            let i = i as f64;
            ((omega * i).sin() * (-i / decay).exp() * volume) as f32
        })
        .collect();

    Ok(ToneBuffer {
        samples,
        sample_rate: SAMPLE_RATE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_rounded_duration() {
        assert_eq!(synthesize(440.0, 1.0, 0.5).unwrap().len(), 44_100);
        assert_eq!(synthesize(440.0, 0.25, 0.5).unwrap().len(), 11_025);
        // 0.00001 s is 0.441 frames
        assert_eq!(synthesize(440.0, 0.00001, 0.5).unwrap().len(), 0);
        assert_eq!(synthesize(440.0, 0.00002, 0.5).unwrap().len(), 1);
    }

    #[test]
    fn samples_follow_formula() {
        let tone = synthesize(440.0, 0.1, 0.5).unwrap();
        for i in [0usize, 1, 37, 1000, 4409] {
            let t = i as f64;
            let expected = (TAU * 440.0 * t / 44_100.0).sin()
                * (-t / (44_100.0 * 0.3)).exp()
                * 0.5;
            assert!((tone.samples()[i] as f64 - expected).abs() < 1e-6);
        }
        assert_eq!(tone.samples()[0], 0.0);
    }

    #[test]
    fn decays_independently_of_duration() {
        let short = synthesize(330.0, 0.5, 0.5).unwrap();
        let long = synthesize(330.0, 2.0, 0.5).unwrap();
        assert_eq!(&long.samples()[..short.len()], short.samples());

        // After 1.5 s (5 time constants) the envelope is below 1% of the peak.
        let tail = &long.samples()[(1.5 * 44_100.0) as usize..];
        assert!(tail.iter().all(|s| s.abs() < 0.5 * 0.01));
    }

    #[test]
    fn volume_bounds_output() {
        let tone = synthesize(523.25, 0.3, 0.3).unwrap();
        assert!(tone.peak() <= 0.3);
        assert!(tone.peak() > 0.25);
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(matches!(
            synthesize(f64::NAN, 1.0, 0.5),
            Err(AudioError::InvalidTone { .. })
        ));
        assert!(synthesize(440.0, -1.0, 0.5).is_err());
        assert!(synthesize(440.0, 1.0, 1.5).is_err());
        assert!(matches!(
            synthesize(440.0, 120.0, 0.5),
            Err(AudioError::BufferTooLarge { .. })
        ));
    }
}
