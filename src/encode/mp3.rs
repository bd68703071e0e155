//! MP3 output via an external ffmpeg process.
//!
//! The waveform is first written as an intermediate WAV next to the target,
//! then handed to ffmpeg for compression. When ffmpeg fails the WAV is left
//! on disk so the render is not lost.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::audio::Waveform;
use crate::encode::wav;
use crate::error::{SwingError, SwingResult};

pub fn write_mp3(waveform: &Waveform, path: &Path) -> SwingResult<()> {
    let temp = temp_wav_path(path);
    wav::write_wav(waveform, &temp)?;

    let output = Command::new("ffmpeg")
        .args([
            "-y",
            "-i",
            &temp.to_string_lossy(),
            "-c:a",
            "libmp3lame",
            "-b:a",
            "192k",
            &path.to_string_lossy(),
        ])
        .output()
        .map_err(|e| SwingError::Encode {
            reason: format!("failed to spawn ffmpeg ({e}); is ffmpeg installed?"),
            preserved: Some(temp.clone()),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SwingError::Encode {
            reason: format!("ffmpeg exited with an error:\n{}", stderr.trim_end()),
            preserved: Some(temp),
        });
    }

    if let Err(e) = std::fs::remove_file(&temp) {
        log::warn!("Could not remove intermediate {}: {}", temp.display(), e);
    }
    log::info!("Wrote {} (192k MP3)", path.display());
    Ok(())
}

/// Intermediate WAV path for an MP3 target, e.g. `out.mp3` -> `out.tmp.wav`.
fn temp_wav_path(path: &Path) -> PathBuf {
    path.with_extension("tmp.wav")
}
