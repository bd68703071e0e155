//! Audio output, dispatched on the output path's extension.

pub mod mp3;
pub mod wav;

use std::path::Path;

use crate::audio::Waveform;
use crate::error::{SwingError, SwingResult};

/// Writes `waveform` to `path` as WAV or MP3 depending on the extension.
pub fn encode_waveform(waveform: &Waveform, path: &Path) -> SwingResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "wav" => wav::write_wav(waveform, path),
        "mp3" => mp3::write_mp3(waveform, path),
        _ => Err(SwingError::UnsupportedExtension {
            role: "output",
            ext,
            path: path.to_path_buf(),
        }),
    }
}
