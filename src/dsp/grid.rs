//! Beat grid value type and the rhythmic re-mapping transforms.

use crate::error::{SwingError, SwingResult};

/// Strictly increasing beat positions in samples, paired with the tempo
/// estimate they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatGrid {
    beats: Vec<usize>,
    tempo_bpm: f32,
}

impl BeatGrid {
    pub fn new(beats: Vec<usize>, tempo_bpm: f32) -> Self {
        debug_assert!(
            beats.windows(2).all(|w| w[0] < w[1]),
            "beat positions must be strictly increasing"
        );
        Self { beats, tempo_bpm }
    }

    pub fn beats(&self) -> &[usize] {
        &self.beats
    }

    pub fn tempo_bpm(&self) -> f32 {
        self.tempo_bpm
    }

    pub fn len(&self) -> usize {
        self.beats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    /// Keeps every other beat starting from the first, halving the felt tempo.
    pub fn halftime(&self) -> BeatGrid {
        BeatGrid::new(
            self.beats.iter().copied().step_by(2).collect(),
            self.tempo_bpm / 2.0,
        )
    }

    /// Inserts a beat at the midpoint of every interval, doubling the felt
    /// tempo. Midpoints truncate toward the earlier beat; a midpoint that
    /// would collide with its neighbor is skipped.
    pub fn doubletime(&self) -> BeatGrid {
        if self.beats.len() < 2 {
            return self.clone();
        }
        let mut beats = Vec::with_capacity(self.beats.len() * 2 - 1);
        for pair in self.beats.windows(2) {
            let mid = (pair[0] + pair[1]) / 2;
            beats.push(pair[0]);
            if mid > pair[0] && mid < pair[1] {
                beats.push(mid);
            }
        }
        beats.push(self.beats[self.beats.len() - 1]);
        BeatGrid::new(beats, self.tempo_bpm * 2.0)
    }

    /// Drops the first beat, shifting the downbeat. Needs at least three
    /// beats so the result still spans a beat interval.
    pub fn remove_first_beat(&self) -> SwingResult<BeatGrid> {
        if self.beats.len() < 3 {
            return Err(SwingError::InvalidGrid(format!(
                "cannot remove the first beat of a {}-beat grid; at least 3 beats required",
                self.beats.len()
            )));
        }
        Ok(BeatGrid::new(self.beats[1..].to_vec(), self.tempo_bpm))
    }
}
