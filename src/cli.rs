use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "swung", about = "Beat-synchronous swing for audio files")]
pub struct Cli {
    /// Input audio file (WAV or MP3)
    pub infile: PathBuf,

    /// Output audio file; defaults to <input>_swing.<ext>
    pub outfile: Option<PathBuf>,

    /// Drop the first detected beat before any other grid change
    #[arg(long)]
    pub remove_first_beat: bool,

    /// Keep every other beat, doubling the felt beat length
    #[arg(long, conflicts_with = "doubletime")]
    pub halftime: bool,

    /// Add a beat halfway through every beat interval
    #[arg(long)]
    pub doubletime: bool,

    /// Straighten an already swung recording instead of swinging it
    #[arg(long)]
    pub deswing: bool,

    /// Also write the original mixed with a click on every beat
    #[arg(long)]
    pub produce_click_track: bool,

    /// Click track output path; defaults to <output stem>_click.wav
    #[arg(long)]
    pub click_track_file: Option<PathBuf>,

    /// Path to a swung.toml config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
