//! Click-track synthesis: a short decaying tone at every detected beat,
//! for checking the grid against the original audio by ear.

use std::f32::consts::PI;

use crate::dsp::grid::BeatGrid;

pub struct ClickTrackSynthesizer {
    frequency_hz: f32,
    duration_secs: f32,
}

impl ClickTrackSynthesizer {
    pub fn new(frequency_hz: f32, duration_secs: f32) -> Self {
        Self {
            frequency_hz,
            duration_secs,
        }
    }

    /// Renders a mono click track spanning `frames` samples, with one click
    /// starting at each beat. Clicks are summed where they overlap and
    /// truncated at the end of the buffer.
    pub fn render(&self, frames: usize, sample_rate: u32, grid: &BeatGrid) -> Vec<f32> {
        let tone = self.tone(sample_rate);
        let mut track = vec![0.0f32; frames];
        for &beat in grid.beats() {
            for (i, &sample) in tone.iter().enumerate() {
                match track.get_mut(beat + i) {
                    Some(slot) => *slot += sample,
                    None => break,
                }
            }
        }
        track
    }

    /// Sine burst with an exponential decay that reaches roughly -87 dB by
    /// the end of the click.
    fn tone(&self, sample_rate: u32) -> Vec<f32> {
        let len = (self.duration_secs * sample_rate as f32).round() as usize;
        let time_constant = len as f32 / 10.0;
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * PI * self.frequency_hz * t).sin() * (-(i as f32) / time_constant).exp()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn synth() -> ClickTrackSynthesizer {
        ClickTrackSynthesizer::new(1000.0, 0.1)
    }

    #[test]
    fn track_spans_exactly_the_requested_frames() {
        let grid = BeatGrid::new(vec![0, 11025], 120.0);
        let track = synth().render(22050, 22050, &grid);
        assert_eq!(track.len(), 22050);
    }

    #[test]
    fn silence_before_the_first_beat() {
        let grid = BeatGrid::new(vec![1000, 5000], 120.0);
        let track = synth().render(10000, 22050, &grid);
        assert!(track[..1000].iter().all(|&s| s == 0.0));
        let peak = track[1000..1200]
            .iter()
            .fold(0.0f32, |acc, &s| acc.max(s.abs()));
        assert!(peak > 0.5, "click onset peaked at only {}", peak);
    }

    #[test]
    fn click_decays_toward_the_tail() {
        let grid = BeatGrid::new(vec![0], 120.0);
        let track = synth().render(2205, 22050, &grid);
        let head = track[..200].iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
        let tail = track[2000..].iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
        assert!(tail < head * 0.01, "head {} tail {}", head, tail);
    }

    #[test]
    fn click_is_truncated_at_the_buffer_end() {
        let grid = BeatGrid::new(vec![1400], 120.0);
        let track = synth().render(1500, 22050, &grid);
        assert_eq!(track.len(), 1500);
        assert!(track[1450].abs() > 0.0);
    }

    #[test]
    fn overlapping_clicks_sum() {
        let synth = synth();
        let solo_a = synth.render(4000, 22050, &BeatGrid::new(vec![0], 120.0));
        let solo_b = synth.render(4000, 22050, &BeatGrid::new(vec![10], 120.0));
        let both = synth.render(4000, 22050, &BeatGrid::new(vec![0, 10], 120.0));
        for i in 0..4000 {
            assert_relative_eq!(both[i], solo_a[i] + solo_b[i], epsilon = 1e-6);
        }
    }
}
