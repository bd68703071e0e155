//! Beat tracking: spectral-flux onset strength, autocorrelation tempo
//! estimation, and dynamic-programming beat selection over the onset
//! envelope.

use crate::audio::Waveform;
use crate::config::AnalysisConfig;
use crate::dsp::grid::BeatGrid;
use crate::dsp::stft;
use crate::error::{SwingError, SwingResult};

/// Assumed tempo when autocorrelation cannot commit to one.
pub const DEFAULT_TEMPO_BPM: f32 = 120.0;

/// Minimum normalized autocorrelation for a tempo peak to count.
const MIN_TEMPO_CORRELATION: f32 = 0.05;

pub struct BeatTracker {
    window_size: usize,
    hop_size: usize,
    min_tempo: f32,
    max_tempo: f32,
    tightness: f32,
}

impl BeatTracker {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            window_size: config.window_size,
            hop_size: config.hop_size,
            min_tempo: config.min_tempo,
            max_tempo: config.max_tempo,
            tightness: config.tightness,
        }
    }

    /// Estimates tempo and beat positions for the waveform's mono mix.
    ///
    /// Signals too short or too featureless to track degrade to a two-beat
    /// grid spanning the whole signal, so downstream stages always see at
    /// least one beat interval.
    pub fn track(&self, waveform: &Waveform) -> SwingResult<BeatGrid> {
        let frames = waveform.frames();
        if frames < 2 {
            return Err(SwingError::DegenerateInput(format!(
                "waveform has {frames} sample(s); nothing to track"
            )));
        }

        let mono = waveform.mono_mix();
        if frames < self.window_size {
            log::warn!(
                "Signal ({} samples) is shorter than one analysis window ({}); \
                 using a start/end beat grid",
                frames,
                self.window_size
            );
            return Ok(degenerate_grid(frames));
        }

        let envelope = self.onset_envelope(&mono)?;
        if count_envelope_peaks(&envelope) < 2 {
            log::warn!("Fewer than two onset peaks detected; using a start/end beat grid");
            return Ok(degenerate_grid(frames));
        }

        let tempo = match self.estimate_tempo(&envelope, waveform.sample_rate) {
            Some(bpm) => bpm,
            None => {
                log::debug!(
                    "Tempo autocorrelation was inconclusive; assuming {DEFAULT_TEMPO_BPM} BPM"
                );
                DEFAULT_TEMPO_BPM
            }
        };

        let period = 60.0 * waveform.sample_rate as f32 / (self.hop_size as f32 * tempo);
        let beat_frames = self.select_beats(&envelope, period);
        if beat_frames.len() < 2 {
            log::warn!("Beat selection found fewer than two beats; using a start/end beat grid");
            return Ok(degenerate_grid(frames));
        }

        let beats: Vec<usize> = beat_frames.iter().map(|&f| f * self.hop_size).collect();
        debug_assert!(beats.last().map_or(true, |&b| b < frames));
        Ok(BeatGrid::new(beats, tempo))
    }

    /// Half-wave-rectified spectral flux per frame, normalized to unit
    /// standard deviation. The first frame has no predecessor and scores 0.
    fn onset_envelope(&self, mono: &[f32]) -> SwingResult<Vec<f32>> {
        let spect = stft::analyze(mono, self.window_size, self.hop_size)?;
        let num_bins = spect.num_bins();

        let mut envelope = Vec::with_capacity(spect.frames.len());
        let mut prev = vec![0.0f32; num_bins];
        for (i, frame) in spect.frames.iter().enumerate() {
            let mut flux = 0.0f32;
            for (slot, c) in prev.iter_mut().zip(&frame.bins) {
                let mag = c.norm();
                flux += (mag - *slot).max(0.0);
                *slot = mag;
            }
            envelope.push(if i == 0 { 0.0 } else { flux });
        }

        let mean = envelope.iter().sum::<f32>() / envelope.len().max(1) as f32;
        let variance = envelope.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>()
            / envelope.len().max(1) as f32;
        let std_dev = variance.sqrt();
        if std_dev > 1e-10 {
            for v in &mut envelope {
                *v /= std_dev;
            }
        }
        Ok(envelope)
    }

    /// Autocorrelation tempo estimate over the configured BPM range, with
    /// parabolic peak refinement. Returns `None` when no lag correlates
    /// convincingly.
    fn estimate_tempo(&self, envelope: &[f32], sample_rate: u32) -> Option<f32> {
        let frame_duration = self.hop_size as f32 / sample_rate as f32;

        let min_lag = ((60.0 / (self.max_tempo * frame_duration)).floor() as usize).max(1);
        let max_lag = (60.0 / (self.min_tempo * frame_duration)).ceil() as usize;
        let max_lag = max_lag.min(envelope.len() / 2);
        if min_lag >= max_lag {
            return None;
        }

        let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
        let centered: Vec<f32> = envelope.iter().map(|&x| x - mean).collect();
        let energy: f32 = centered.iter().map(|&x| x * x).sum();
        if energy < 1e-10 {
            return None;
        }

        let n = centered.len();
        let corr_at = |lag: usize| -> f32 {
            centered[..n - lag]
                .iter()
                .zip(centered[lag..].iter())
                .map(|(&a, &b)| a * b)
                .sum::<f32>()
                / energy
        };

        let mut best_lag = min_lag;
        let mut best_corr = f32::NEG_INFINITY;
        for lag in min_lag..=max_lag {
            let corr = corr_at(lag);
            if corr > best_corr {
                best_corr = corr;
                best_lag = lag;
            }
        }
        if best_corr < MIN_TEMPO_CORRELATION {
            return None;
        }

        // Parabolic fit around the winning lag for sub-frame precision.
        let tempo_lag = if best_lag > min_lag && best_lag < max_lag {
            let prev = corr_at(best_lag - 1);
            let next = corr_at(best_lag + 1);
            let denom = prev - 2.0 * best_corr + next;
            if denom.abs() > 1e-10 {
                best_lag as f32 + 0.5 * (prev - next) / denom
            } else {
                best_lag as f32
            }
        } else {
            best_lag as f32
        };

        let beat_period = tempo_lag * frame_duration;
        if beat_period <= 0.0 {
            return None;
        }
        let bpm = 60.0 / beat_period;

        // Fast estimates are often the first harmonic of the real pulse;
        // prefer the half tempo when its lag correlates almost as well.
        if bpm > 160.0 {
            let double_lag = (tempo_lag * 2.0).round() as usize;
            if double_lag <= max_lag && corr_at(double_lag) > best_corr * 0.6 {
                return Some(bpm / 2.0);
            }
        }
        Some(bpm)
    }

    /// Dynamic-programming beat selection: each frame either extends the best
    /// previous beat roughly one period back, paying a log-squared penalty
    /// for deviating from the period, or starts a fresh chain.
    fn select_beats(&self, envelope: &[f32], period: f32) -> Vec<usize> {
        let n = envelope.len();
        if n == 0 || !(period.is_finite() && period > 0.0) {
            return Vec::new();
        }
        let period = period.max(1.0);
        let lower_span = (2.0 * period).round() as usize;
        let upper_span = ((period / 2.0).round() as usize).max(1);

        let mut cumscore = vec![0.0f32; n];
        let mut backlink = vec![-1isize; n];
        for t in 0..n {
            let mut best = 0.0f32;
            let mut best_tau = -1isize;
            if t >= upper_span {
                let lo = t.saturating_sub(lower_span);
                for tau in lo..=t - upper_span {
                    let delta = (t - tau) as f32;
                    let penalty = -self.tightness * (delta / period).ln().powi(2);
                    let score = cumscore[tau] + penalty;
                    if score > best {
                        best = score;
                        best_tau = tau as isize;
                    }
                }
            }
            cumscore[t] = envelope[t] + best;
            backlink[t] = best_tau;
        }

        // End the chain at the last confident local maximum of the score.
        let local_maxima: Vec<usize> = (1..n.saturating_sub(1))
            .filter(|&i| cumscore[i] > cumscore[i - 1] && cumscore[i] >= cumscore[i + 1])
            .collect();
        let tail = if local_maxima.is_empty() {
            cumscore
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap_or(0)
        } else {
            let mut scores: Vec<f32> = local_maxima.iter().map(|&i| cumscore[i]).collect();
            scores.sort_by(f32::total_cmp);
            let threshold = 0.5 * scores[scores.len() / 2];
            local_maxima
                .iter()
                .rev()
                .find(|&&i| cumscore[i] >= threshold)
                .copied()
                .unwrap_or(local_maxima[local_maxima.len() - 1])
        };

        let mut beats = Vec::new();
        let mut idx = tail as isize;
        while idx >= 0 {
            beats.push(idx as usize);
            idx = backlink[idx as usize];
        }
        beats.reverse();
        beats
    }
}

fn degenerate_grid(frames: usize) -> BeatGrid {
    BeatGrid::new(vec![0, frames - 1], DEFAULT_TEMPO_BPM)
}

/// Counts local maxima that clear an adaptive mean + half-sigma threshold.
fn count_envelope_peaks(envelope: &[f32]) -> usize {
    if envelope.len() < 3 {
        return 0;
    }
    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let variance =
        envelope.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / envelope.len() as f32;
    let threshold = (mean + 0.5 * variance.sqrt()).max(1e-6);
    (1..envelope.len() - 1)
        .filter(|&i| {
            envelope[i] > threshold
                && envelope[i] >= envelope[i - 1]
                && envelope[i] >= envelope[i + 1]
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(hop_size: usize) -> AnalysisConfig {
        AnalysisConfig {
            window_size: 2048,
            hop_size,
            min_tempo: 40.0,
            max_tempo: 240.0,
            tightness: 100.0,
        }
    }

    /// Kick drum hits every `samples_per_beat` samples, each a short
    /// downward frequency sweep.
    fn kick_track(sample_rate: u32, total: usize, samples_per_beat: usize) -> Vec<f32> {
        let mut signal = vec![0.0f32; total];
        for beat in 0..(total / samples_per_beat) {
            let pos = beat * samples_per_beat;
            for i in 0..1000 {
                if pos + i < total {
                    let t = i as f32 / sample_rate as f32;
                    let freq = 150.0 * (1.0 - t * 10.0).exp();
                    signal[pos + i] += 0.5 * (2.0 * std::f32::consts::PI * freq * t).sin();
                }
            }
        }
        signal
    }

    #[test]
    fn tracks_a_steady_120_bpm_kick() {
        let sr = 22050;
        let samples_per_beat = 11025; // 120 BPM
        let signal = kick_track(sr, sr as usize * 8, samples_per_beat);
        // 441-sample hops make each beat exactly 25 frames long.
        let tracker = BeatTracker::new(&test_config(441));
        let grid = tracker.track(&Waveform::mono(signal, sr)).unwrap();

        assert!(
            (grid.tempo_bpm() - 120.0).abs() < 3.0,
            "tempo was {}",
            grid.tempo_bpm()
        );
        assert!(grid.len() >= 12, "only {} beats found", grid.len());
        for pair in grid.beats().windows(2) {
            let interval = (pair[1] - pair[0]) as i64;
            assert!(
                (interval - samples_per_beat as i64).abs() <= 882,
                "interval {} off the 11025-sample pulse",
                interval
            );
        }
    }

    #[test]
    fn silence_degrades_to_start_end_grid() {
        let signal = vec![0.0f32; 66150];
        let tracker = BeatTracker::new(&test_config(512));
        let grid = tracker.track(&Waveform::mono(signal, 22050)).unwrap();
        assert_eq!(grid.beats(), &[0, 66149]);
        assert_eq!(grid.tempo_bpm(), DEFAULT_TEMPO_BPM);
    }

    #[test]
    fn short_signal_degrades_to_start_end_grid() {
        let signal: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.01).sin()).collect();
        let tracker = BeatTracker::new(&test_config(512));
        let grid = tracker.track(&Waveform::mono(signal, 22050)).unwrap();
        assert_eq!(grid.beats(), &[0, 999]);
    }

    #[test]
    fn empty_waveform_is_rejected() {
        let tracker = BeatTracker::new(&test_config(512));
        let err = tracker.track(&Waveform::mono(Vec::new(), 44100)).unwrap_err();
        assert!(matches!(err, SwingError::DegenerateInput(_)));
    }

    #[test]
    fn tempo_estimate_matches_an_impulse_train() {
        let tracker = BeatTracker::new(&test_config(441));
        // 25-frame period at 50 fps is exactly 120 BPM.
        let envelope: Vec<f32> = (0..300).map(|i| if i % 25 == 0 { 1.0 } else { 0.0 }).collect();
        let bpm = tracker.estimate_tempo(&envelope, 22050).unwrap();
        assert!((bpm - 120.0).abs() < 1.0, "estimated {} BPM", bpm);
    }

    #[test]
    fn tempo_estimate_rejects_flat_envelope() {
        let tracker = BeatTracker::new(&test_config(512));
        let envelope = vec![0.5f32; 300];
        assert!(tracker.estimate_tempo(&envelope, 22050).is_none());
    }

    #[test]
    fn beat_selection_follows_periodic_peaks() {
        let tracker = BeatTracker::new(&test_config(512));
        let envelope: Vec<f32> = (0..100).map(|i| if i % 10 == 0 { 1.0 } else { 0.0 }).collect();
        let beats = tracker.select_beats(&envelope, 10.0);
        assert_eq!(beats, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90]);
    }
}
