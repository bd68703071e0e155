//! Pitch-preserving time stretching with a phase vocoder.
//!
//! A segment is analyzed at a fixed hop and its frame timeline is resampled
//! against a scaled synthesis hop, re-accumulating per-bin phases for the
//! new spacing before the frames are overlap-added back. Segments too short
//! to window fall back to linear resampling, which changes pitch but keeps
//! the output length contract.

use std::f32::consts::PI;

use rustfft::num_complex::Complex;

use crate::dsp::stft::{self, SpectralFrame, Spectrogram};
use crate::error::{SwingError, SwingResult};

const TWO_PI: f32 = 2.0 * PI;

pub struct PhaseVocoderStretcher {
    window_size: usize,
    hop_size: usize,
}

impl PhaseVocoderStretcher {
    pub fn new(window_size: usize, hop_size: usize) -> Self {
        Self {
            window_size,
            hop_size,
        }
    }

    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Stretches `segment` to `round(len / rate)` samples. Rates above 1
    /// compress, rates below 1 lengthen; pitch is preserved on the vocoder
    /// path.
    pub fn stretch(&self, segment: &[f32], rate: f32) -> SwingResult<Vec<f32>> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(SwingError::InvalidRate(rate));
        }

        let target_len = (segment.len() as f64 / rate as f64).round() as usize;
        if segment.is_empty() || target_len == 0 {
            return Ok(Vec::new());
        }
        if (rate - 1.0).abs() < f32::EPSILON {
            return Ok(segment.to_vec());
        }

        if segment.len() < self.window_size {
            log::debug!(
                "Segment of {} samples is shorter than the {}-sample analysis window; \
                 resampling instead of vocoding",
                segment.len(),
                self.window_size
            );
            return Ok(resample_linear(segment, target_len));
        }

        // Trailing zero pad keeps analysis frames sliding past the segment
        // end, so the tail is stretched instead of cut off at the target
        // length.
        let mut padded = Vec::with_capacity(segment.len() + self.window_size);
        padded.extend_from_slice(segment);
        padded.resize(segment.len() + self.window_size, 0.0);

        let spect = stft::analyze(&padded, self.window_size, self.hop_size)?;
        let hop_out = ((self.hop_size as f64 / rate as f64).round() as usize).max(1);
        let warped = warp_frames(&spect, rate as f64, hop_out);

        let mut output = stft::synthesize(&warped, hop_out);
        output.resize(target_len, 0.0);
        Ok(output)
    }
}

/// Resamples the analysis frames onto a synthesis timeline spaced `hop_out`
/// samples apart and rebuilds every phase for that spacing.
///
/// The timeline advances `hop_out * rate / hop` analysis frames per
/// synthesis frame, so the fractional remainder of the rounded synthesis hop
/// is carried forward instead of drifting the effective rate. Magnitudes are
/// interpolated between the bracketing analysis frames; each bin advances by
/// its expected per-hop phase plus the wrapped deviation observed between
/// those frames, scaled by the hop ratio. The first frame keeps its analysis
/// phases so the segment onset is reproduced faithfully.
fn warp_frames(input: &Spectrogram, rate: f64, hop_out: usize) -> Spectrogram {
    let n = input.window_size;
    let num_bins = input.num_bins();
    if input.frames.len() < 2 {
        return Spectrogram {
            frames: input.frames.clone(),
            window_size: n,
            hop_size: hop_out,
        };
    }
    let hop_ratio = hop_out as f32 / input.hop_size as f32;
    let step = hop_out as f64 * rate / input.hop_size as f64;

    let expected: Vec<f32> = (0..num_bins)
        .map(|bin| TWO_PI * bin as f32 * input.hop_size as f32 / n as f32)
        .collect();

    let magnitudes: Vec<Vec<f32>> = input
        .frames
        .iter()
        .map(|frame| frame.bins.iter().map(|c| c.norm()).collect())
        .collect();
    let phases: Vec<Vec<f32>> = input
        .frames
        .iter()
        .map(|frame| frame.bins.iter().map(|c| c.arg()).collect())
        .collect();

    let last = input.frames.len() - 1;
    let mut phase_accum = phases[0].clone();
    let mut frames = Vec::with_capacity((last as f64 / step).ceil() as usize);
    let mut idx = 0usize;
    loop {
        let pos = idx as f64 * step;
        let k = pos as usize;
        if k >= last {
            break;
        }
        let frac = (pos - k as f64) as f32;

        let mut bins = Vec::with_capacity(num_bins);
        for bin in 0..num_bins {
            let magnitude = magnitudes[k][bin] * (1.0 - frac) + magnitudes[k + 1][bin] * frac;
            bins.push(Complex::from_polar(magnitude, phase_accum[bin]));
        }
        frames.push(SpectralFrame {
            bins,
            center: idx * hop_out + n / 2,
        });

        for bin in 0..num_bins {
            let deviation = wrap_phase(phases[k + 1][bin] - phases[k][bin] - expected[bin]);
            phase_accum[bin] += (expected[bin] + deviation) * hop_ratio;
        }
        idx += 1;
    }

    Spectrogram {
        frames,
        window_size: n,
        hop_size: hop_out,
    }
}

/// Wraps a phase value to [-PI, PI].
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    let p = phase + PI;
    p - (p / TWO_PI).floor() * TWO_PI - PI
}

/// Length-exact linear resampling for segments shorter than one window.
fn resample_linear(input: &[f32], target_len: usize) -> Vec<f32> {
    if target_len == 0 {
        return Vec::new();
    }
    if input.len() < 2 {
        return vec![input.first().copied().unwrap_or(0.0); target_len];
    }
    let scale = (input.len() - 1) as f64 / (target_len - 1).max(1) as f64;
    (0..target_len)
        .map(|i| {
            let pos = i as f64 * scale;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            let a = input[idx];
            let b = input[(idx + 1).min(input.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (TWO_PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn rejects_non_positive_and_non_finite_rates() {
        let stretcher = PhaseVocoderStretcher::new(1024, 256);
        let input = sine(440.0, 44100, 2048);
        for rate in [0.0, -0.5, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                stretcher.stretch(&input, rate),
                Err(SwingError::InvalidRate(_))
            ));
        }
    }

    #[test]
    fn output_length_is_rounded_input_over_rate() {
        let stretcher = PhaseVocoderStretcher::new(1024, 256);
        let input = sine(440.0, 44100, 8192);
        for rate in [0.5f32, 2.0 / 3.0, 0.75, 1.25, 4.0 / 3.0, 1.5, 2.0] {
            let out = stretcher.stretch(&input, rate).unwrap();
            let expected = (8192f64 / rate as f64).round() as usize;
            assert_eq!(out.len(), expected, "rate {}", rate);
        }
    }

    #[test]
    fn identity_rate_returns_the_segment_unchanged() {
        let stretcher = PhaseVocoderStretcher::new(1024, 256);
        let input = sine(220.0, 44100, 4096);
        let out = stretcher.stretch(&input, 1.0).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn round_trip_length_error_is_at_most_one_sample() {
        let stretcher = PhaseVocoderStretcher::new(1024, 256);
        let input = sine(440.0, 44100, 8192);
        for rate in [2.0f32 / 3.0, 4.0 / 3.0, 1.5] {
            let stretched = stretcher.stretch(&input, rate).unwrap();
            let back = stretcher.stretch(&stretched, 1.0 / rate).unwrap();
            let error = back.len() as i64 - input.len() as i64;
            assert!(error.abs() <= 1, "rate {}: length error {}", rate, error);
        }
    }

    #[test]
    fn stretching_keeps_the_pitch_of_a_sine() {
        let stretcher = PhaseVocoderStretcher::new(1024, 256);
        let sr = 44100;
        let input = sine(440.0, sr, 16384);
        let out = stretcher.stretch(&input, 2.0 / 3.0).unwrap();

        // A 440 Hz tone crosses zero 880 times per second regardless of
        // how long it plays.
        let interior = &out[1024..out.len() - 1024];
        let crossings = interior
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        let crossings_per_sec = crossings as f32 * sr as f32 / interior.len() as f32;
        assert_relative_eq!(crossings_per_sec, 880.0, max_relative = 0.05);
    }

    #[test]
    fn stretched_sine_keeps_its_energy() {
        let stretcher = PhaseVocoderStretcher::new(1024, 256);
        let input = sine(440.0, 44100, 8192);
        let out = stretcher.stretch(&input, 1.5).unwrap();
        let input_rms = rms(&input);
        let output_rms = rms(&out);
        assert!(
            (output_rms - input_rms).abs() < 0.2,
            "rms drifted from {} to {}",
            input_rms,
            output_rms
        );
    }

    #[test]
    fn rounded_synthesis_hop_still_fills_the_stretched_tail() {
        // 16 / 10.49 rounds the synthesis hop down to 10, so a uniform hop
        // would run ~5% fast and leave the end of the target length silent;
        // the fractional frame timeline must absorb the remainder.
        let stretcher = PhaseVocoderStretcher::new(64, 16);
        let input = sine(2756.25, 44100, 4096);
        let rate = 16.0 / 10.49;
        let out = stretcher.stretch(&input, rate).unwrap();
        assert_eq!(out.len(), (4096f64 / rate as f64).round() as usize);
        let tail = &out[out.len() - 64..];
        assert!(
            tail.iter().any(|&s| s.abs() > 0.05),
            "stretched tail decayed to silence"
        );
    }

    #[test]
    fn short_segments_fall_back_to_resampling() {
        let stretcher = PhaseVocoderStretcher::new(1024, 256);
        let input: Vec<f32> = (0..500).map(|i| i as f32 / 500.0).collect();
        let out = stretcher.stretch(&input, 2.0 / 3.0).unwrap();
        assert_eq!(out.len(), 750);
        assert_relative_eq!(out[0], input[0]);
        assert_relative_eq!(out[749], input[499]);
    }

    #[test]
    fn empty_segment_stretches_to_empty() {
        let stretcher = PhaseVocoderStretcher::new(1024, 256);
        assert!(stretcher.stretch(&[], 1.5).unwrap().is_empty());
    }

    #[test]
    fn wrap_phase_stays_in_pi_range() {
        for raw in [-10.0f32, -PI, -0.5, 0.0, 0.5, PI, 10.0, 25.0] {
            let wrapped = wrap_phase(raw);
            assert!((-PI..=PI).contains(&wrapped), "{} wrapped to {}", raw, wrapped);
            // Wrapping must preserve the angle modulo a full turn.
            let diff = (raw - wrapped) / TWO_PI;
            assert_relative_eq!(diff, diff.round(), epsilon = 1e-4);
        }
    }

    #[test]
    fn resample_linear_interpolates_between_endpoints() {
        let out = resample_linear(&[0.0, 1.0], 5);
        let expected = [0.0, 0.25, 0.5, 0.75, 1.0];
        for (a, e) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *e);
        }
    }
}
