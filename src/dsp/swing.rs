//! Beat-synchronous re-timing: every beat interval is split at its midpoint
//! and the two halves are time-stretched by complementary rates, giving the
//! audio a swung (or straightened) feel.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::audio::Waveform;
use crate::config::AnalysisConfig;
use crate::dsp::grid::BeatGrid;
use crate::dsp::stretch::PhaseVocoderStretcher;
use crate::error::{SwingError, SwingResult};

/// Lengthen the first half of each beat, compress the second.
pub const SWING_RATES: (f32, f32) = (2.0 / 3.0, 4.0 / 3.0);
/// Inverse pair that straightens out an already swung groove.
pub const DESWING_RATES: (f32, f32) = (3.0 / 2.0, 3.0 / 4.0);

pub struct SwingEngine {
    stretcher: PhaseVocoderStretcher,
}

impl SwingEngine {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            stretcher: PhaseVocoderStretcher::new(config.window_size, config.hop_size),
        }
    }

    /// Re-times every beat interval of `waveform` and splices the stretched
    /// halves back together in order. Audio before the first beat and after
    /// the last beat is dropped; the output spans exactly the re-timed beat
    /// intervals.
    pub fn apply(
        &self,
        waveform: &Waveform,
        grid: &BeatGrid,
        rate_first: f32,
        rate_second: f32,
    ) -> SwingResult<Waveform> {
        let beats = grid.beats();
        if beats.len() < 2 {
            return Err(SwingError::DegenerateInput(format!(
                "beat grid has {} beat(s); at least one full interval is required",
                beats.len()
            )));
        }
        let frames = waveform.frames();
        let last_beat = beats[beats.len() - 1];
        if last_beat >= frames {
            return Err(SwingError::InvalidGrid(format!(
                "beat at sample {last_beat} lies outside the {frames}-sample waveform"
            )));
        }

        let pairs: Vec<(usize, usize, usize)> = beats
            .windows(2)
            .map(|pair| (pair[0], (pair[0] + pair[1]) / 2, pair[1]))
            .collect();

        log::debug!(
            "Re-timing samples {}..{}; dropping {} lead-in and {} trailing samples",
            beats[0],
            last_beat,
            beats[0],
            frames - last_beat
        );

        let window = self.stretcher.window_size();
        let short_halves = pairs
            .iter()
            .flat_map(|&(start, mid, end)| [mid - start, end - mid])
            .filter(|&len| len > 0 && len < window)
            .count();
        if short_halves > 0 {
            log::warn!(
                "{} of {} half-beat segments are shorter than the analysis window; \
                 they were resampled without pitch preservation",
                short_halves,
                pairs.len() * 2
            );
        }

        let pb = ProgressBar::new((pairs.len() * waveform.channel_count()) as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} segments ({eta} remaining)")
                .unwrap()
                .progress_chars("=>-"),
        );

        let mut channels = Vec::with_capacity(waveform.channel_count());
        for channel in &waveform.channels {
            let stretched: Vec<(Vec<f32>, Vec<f32>)> = pairs
                .par_iter()
                .map(|&(start, mid, end)| {
                    let first = self.stretcher.stretch(&channel[start..mid], rate_first)?;
                    let second = self.stretcher.stretch(&channel[mid..end], rate_second)?;
                    pb.inc(1);
                    Ok((first, second))
                })
                .collect::<SwingResult<_>>()?;

            let total: usize = stretched.iter().map(|(a, b)| a.len() + b.len()).sum();
            let mut out = Vec::with_capacity(total);
            for (first, second) in stretched {
                out.extend_from_slice(&first);
                out.extend_from_slice(&second);
            }
            channels.push(out);
        }
        pb.finish_and_clear();

        Ok(Waveform::new(channels, waveform.sample_rate))
    }
}
