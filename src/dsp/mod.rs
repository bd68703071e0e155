//! Signal processing stages of the swing pipeline.

pub mod beat;
pub mod click;
pub mod grid;
pub mod stft;
pub mod stretch;
pub mod swing;

pub use beat::BeatTracker;
pub use click::ClickTrackSynthesizer;
pub use grid::BeatGrid;
pub use stretch::PhaseVocoderStretcher;
pub use swing::{SwingEngine, DESWING_RATES, SWING_RATES};
