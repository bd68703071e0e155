use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{SwingError, SwingResult};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub click: ClickConfig,
}

/// STFT framing and beat-tracking tuning shared by the tracker and the
/// stretcher.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,
    #[serde(default = "default_min_tempo")]
    pub min_tempo: f32,
    #[serde(default = "default_max_tempo")]
    pub max_tempo: f32,
    #[serde(default = "default_tightness")]
    pub tightness: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickConfig {
    #[serde(default = "default_click_frequency")]
    pub frequency_hz: f32,
    #[serde(default = "default_click_duration")]
    pub duration_secs: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            hop_size: default_hop_size(),
            min_tempo: default_min_tempo(),
            max_tempo: default_max_tempo(),
            tightness: default_tightness(),
        }
    }
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_click_frequency(),
            duration_secs: default_click_duration(),
        }
    }
}

fn default_window_size() -> usize { 2048 }
fn default_hop_size() -> usize { 512 }
fn default_min_tempo() -> f32 { 40.0 }
fn default_max_tempo() -> f32 { 240.0 }
fn default_tightness() -> f32 { 100.0 }
fn default_click_frequency() -> f32 { 1000.0 }
fn default_click_duration() -> f32 { 0.1 }

pub fn load_config(path: &PathBuf) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Checks that a path carries one of the supported audio extensions.
pub fn validate_extension(path: &Path, role: &'static str) -> SwingResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !crate::SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(SwingError::UnsupportedExtension {
            role,
            ext,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Validates the input extension, fills in the default output path when none
/// was given, and rejects outputs that would overwrite the input. All of
/// this happens before any audio is decoded.
pub fn resolve_output_path(input: &Path, output: Option<&Path>) -> SwingResult<PathBuf> {
    validate_extension(input, "input")?;
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(input),
    };
    validate_extension(&output, "output")?;
    if output.as_path() == input {
        return Err(SwingError::OutputIsInput(output));
    }
    Ok(output)
}

/// `take5.wav` becomes `take5_swing.wav`, keeping the input's directory and
/// extension.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let ext = input.extension().and_then(|e| e.to_str()).unwrap_or("wav");
    input.with_file_name(format!("{stem}_swing.{ext}"))
}

/// Click tracks default to `<output stem>_click.wav` next to the output.
/// The click mix is always written as WAV unless an explicit path says
/// otherwise.
pub fn click_track_path(output: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
            output.with_file_name(format!("{stem}_click.wav"))
        }
    }
}
