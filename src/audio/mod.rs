//! Decoded audio and the planar waveform type shared by the whole pipeline.

pub mod decode;

/// Planar PCM audio. Every channel holds the same number of frames.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        debug_assert!(
            channels.windows(2).all(|w| w[0].len() == w[1].len()),
            "channels must be equal length"
        );
        Self {
            channels,
            sample_rate,
        }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(vec![samples], sample_rate)
    }

    /// Number of sample frames per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Average of all channels. Beat analysis runs on this mix so that
    /// every channel shares one beat grid.
    pub fn mono_mix(&self) -> Vec<f32> {
        match self.channels.len() {
            0 => Vec::new(),
            1 => self.channels[0].clone(),
            n => {
                let scale = 1.0 / n as f32;
                let mut mix = vec![0.0f32; self.frames()];
                for channel in &self.channels {
                    for (acc, &s) in mix.iter_mut().zip(channel) {
                        *acc += s * scale;
                    }
                }
                mix
            }
        }
    }

    /// Adds a mono overlay into every channel. The overlay must span the
    /// same number of frames as the waveform.
    pub fn mix_mono(&self, overlay: &[f32]) -> Waveform {
        debug_assert_eq!(overlay.len(), self.frames());
        let channels = self
            .channels
            .iter()
            .map(|channel| {
                channel
                    .iter()
                    .zip(overlay)
                    .map(|(&s, &o)| s + o)
                    .collect()
            })
            .collect();
        Waveform::new(channels, self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_mix_averages_channels() {
        let wave = Waveform::new(vec![vec![1.0, 0.0, -1.0], vec![0.0, 1.0, -1.0]], 44100);
        let mix = wave.mono_mix();
        assert_eq!(mix, vec![0.5, 0.5, -1.0]);
    }

    #[test]
    fn mono_mix_of_single_channel_is_identity() {
        let wave = Waveform::mono(vec![0.25, -0.5], 22050);
        assert_eq!(wave.mono_mix(), vec![0.25, -0.5]);
    }

    #[test]
    fn mix_mono_adds_overlay_to_every_channel() {
        let wave = Waveform::new(vec![vec![0.1, 0.2], vec![-0.1, -0.2]], 44100);
        let mixed = wave.mix_mono(&[0.5, 0.5]);
        assert_eq!(mixed.channels[0], vec![0.6, 0.7]);
        assert_eq!(mixed.channels[1], vec![0.4, 0.3]);
    }

    #[test]
    fn frames_of_empty_waveform_is_zero() {
        let wave = Waveform::new(Vec::new(), 44100);
        assert_eq!(wave.frames(), 0);
        assert!(wave.is_empty());
    }
}
