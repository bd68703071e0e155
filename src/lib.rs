pub mod audio;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod encode;
pub mod error;

/// Audio file extensions we accept for input and output
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3"];

/// Application name for XDG paths
pub const APP_NAME: &str = "swung";
