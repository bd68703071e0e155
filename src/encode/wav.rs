//! 16-bit PCM WAV output via hound.

use std::path::Path;

use crate::audio::Waveform;
use crate::error::{SwingError, SwingResult};

pub fn write_wav(waveform: &Waveform, path: &Path) -> SwingResult<()> {
    let spec = hound::WavSpec {
        channels: waveform.channel_count() as u16,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let fail = |e: hound::Error| SwingError::Encode {
        reason: format!("failed to write {}: {e}", path.display()),
        preserved: None,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(fail)?;
    for frame in 0..waveform.frames() {
        for channel in &waveform.channels {
            let sample = (channel[frame].clamp(-1.0, 1.0) * 32767.0) as i16;
            writer.write_sample(sample).map_err(fail)?;
        }
    }
    writer.finalize().map_err(fail)?;

    log::info!(
        "Wrote {} ({} frames, {} channel(s), {}Hz)",
        path.display(),
        waveform.frames(),
        waveform.channel_count(),
        waveform.sample_rate
    );
    Ok(())
}
