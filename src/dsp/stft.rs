//! Shared STFT front end: Hann-windowed analysis into spectral frames and
//! overlap-add resynthesis. Both beat analysis and the time stretcher read
//! audio through this module.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{SwingError, SwingResult};

/// Fraction of the peak window-sum below which overlap-add division is clamped.
const MIN_WINDOW_SUM_RATIO: f32 = 0.1;
/// Absolute floor for window sum normalization.
const WINDOW_SUM_EPSILON: f32 = 1e-6;

/// One analysis frame: the non-redundant half spectrum of a windowed slice.
#[derive(Debug, Clone)]
pub struct SpectralFrame {
    /// `window_size / 2 + 1` complex bins, DC through the top of the
    /// non-redundant half spectrum.
    pub bins: Vec<Complex<f32>>,
    /// Sample index of the frame center in the source signal.
    pub center: usize,
}

/// Time-ordered spectral frames spaced `hop_size` samples apart.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<SpectralFrame>,
    pub window_size: usize,
    pub hop_size: usize,
}

impl Spectrogram {
    pub fn num_bins(&self) -> usize {
        self.window_size / 2 + 1
    }
}

pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

/// Slices `samples` into Hann-windowed frames every `hop_size` samples and
/// FFTs each one. The last frame is zero-padded when the signal does not end
/// on a window boundary, so the tail is always covered.
pub fn analyze(samples: &[f32], window_size: usize, hop_size: usize) -> SwingResult<Spectrogram> {
    if window_size < 2 || hop_size == 0 || hop_size > window_size {
        return Err(SwingError::InvalidWindow {
            window: window_size,
            hop: hop_size,
        });
    }
    if samples.len() < window_size {
        return Err(SwingError::WindowExceedsInput {
            window: window_size,
            len: samples.len(),
        });
    }

    let window = hann_window(window_size);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(window_size);
    let num_bins = window_size / 2 + 1;

    let mut frames = Vec::with_capacity(samples.len() / hop_size + 1);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); window_size];
    let mut start = 0;
    loop {
        let take = window_size.min(samples.len() - start);
        for i in 0..take {
            buffer[i] = Complex::new(samples[start + i] * window[i], 0.0);
        }
        for slot in buffer[take..].iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }
        fft.process(&mut buffer);

        frames.push(SpectralFrame {
            bins: buffer[..num_bins].to_vec(),
            center: start + window_size / 2,
        });

        if start + window_size >= samples.len() {
            break;
        }
        start += hop_size;
    }

    Ok(Spectrogram {
        frames,
        window_size,
        hop_size,
    })
}

/// Overlap-adds the inverse FFT of every frame at `hop_size` spacing and
/// divides by the accumulated squared window so overlap depth cancels out.
/// The hop is a parameter so a caller may resynthesize at a different spacing
/// than the frames were analyzed at.
pub fn synthesize(spectrogram: &Spectrogram, hop_size: usize) -> Vec<f32> {
    if spectrogram.frames.is_empty() {
        return Vec::new();
    }
    let n = spectrogram.window_size;
    let num_bins = spectrogram.num_bins();
    let window = hann_window(n);
    let mut planner = FftPlanner::<f32>::new();
    let ifft = planner.plan_fft_inverse(n);

    let out_len = (spectrogram.frames.len() - 1) * hop_size + n;
    let mut output = vec![0.0f32; out_len];
    let mut window_sum = vec![0.0f32; out_len];
    let mut buffer = vec![Complex::new(0.0f32, 0.0); n];
    let scale = 1.0 / n as f32;

    for (idx, frame) in spectrogram.frames.iter().enumerate() {
        debug_assert_eq!(frame.bins.len(), num_bins);
        buffer[..num_bins].copy_from_slice(&frame.bins);
        // Conjugate mirror restores the full spectrum of a real signal.
        // Even windows hold a self-conjugate Nyquist bin; odd windows do not.
        for bin in 1..(n + 1) / 2 {
            buffer[n - bin] = frame.bins[bin].conj();
        }
        ifft.process(&mut buffer);

        let offset = idx * hop_size;
        for i in 0..n {
            output[offset + i] += buffer[i].re * scale * window[i];
            window_sum[offset + i] += window[i] * window[i];
        }
    }

    normalize_output(&mut output, &window_sum);
    output
}

fn normalize_output(output: &mut [f32], window_sum: &[f32]) {
    let max_window_sum = window_sum.iter().copied().fold(0.0f32, f32::max);
    let min_window_sum = (max_window_sum * MIN_WINDOW_SUM_RATIO).max(WINDOW_SUM_EPSILON);
    for (sample, &ws) in output.iter_mut().zip(window_sum.iter()) {
        *sample /= ws.max(min_window_sum);
    }
}
