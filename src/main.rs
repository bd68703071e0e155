use anyhow::Result;
use clap::Parser;

use swung::audio;
use swung::cli::Cli;
use swung::config;
use swung::dsp::{BeatTracker, ClickTrackSynthesizer, SwingEngine, DESWING_RATES, SWING_RATES};
use swung::encode;
use swung::error::SwingError;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect swung.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = std::path::PathBuf::from("swung.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join(swung::APP_NAME).join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join(swung::APP_NAME).join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    let config = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                config::Config::default()
            }
        },
        None => config::Config::default(),
    };

    // Resolve and validate every output path before any DSP runs.
    let output = config::resolve_output_path(&cli.infile, cli.outfile.as_deref())?;
    let click_path = if cli.produce_click_track {
        let path = config::click_track_path(&output, cli.click_track_file.as_deref());
        config::validate_extension(&path, "click track")?;
        Some(path)
    } else {
        None
    };

    if !cli.infile.exists() {
        anyhow::bail!("Input file not found: {}", cli.infile.display());
    }

    log::info!("swung - beat-synchronous swing processor");
    log::info!("Input: {}", cli.infile.display());
    log::info!("Output: {}", output.display());

    // 1. Decode audio
    log::info!("Decoding audio...");
    let waveform = audio::decode::decode_audio(&cli.infile)?;
    if waveform.is_empty() {
        return Err(SwingError::DegenerateInput(format!(
            "{} decoded to zero samples",
            cli.infile.display()
        ))
        .into());
    }

    // 2. Track beats on the mono mix
    log::info!("Tracking beats...");
    let tracker = BeatTracker::new(&config.analysis);
    let mut grid = tracker.track(&waveform)?;
    log::info!("Tempo: {:.1} BPM, {} beats", grid.tempo_bpm(), grid.len());

    // 3. Grid transforms; the first beat is removed before any re-mapping
    if cli.remove_first_beat {
        grid = grid.remove_first_beat()?;
    }
    if cli.halftime {
        grid = grid.halftime();
        log::info!("Halftime: {} beats at {:.1} BPM", grid.len(), grid.tempo_bpm());
    }
    if cli.doubletime {
        grid = grid.doubletime();
        log::info!("Doubletime: {} beats at {:.1} BPM", grid.len(), grid.tempo_bpm());
    }

    // 4. Click track over the original, pre-swing audio
    if let Some(ref click_path) = click_path {
        log::info!("Writing click track: {}", click_path.display());
        let synth =
            ClickTrackSynthesizer::new(config.click.frequency_hz, config.click.duration_secs);
        let click = synth.render(waveform.frames(), waveform.sample_rate, &grid);
        encode::encode_waveform(&waveform.mix_mono(&click), click_path)?;
    }

    // 5. Re-time every beat interval
    let (rate_first, rate_second) = if cli.deswing {
        log::info!("Removing swing...");
        DESWING_RATES
    } else {
        log::info!("Applying swing...");
        SWING_RATES
    };
    let engine = SwingEngine::new(&config.analysis);
    let swung = engine.apply(&waveform, &grid, rate_first, rate_second)?;

    // 6. Encode
    log::info!("Encoding output...");
    if let Err(err) = encode::encode_waveform(&swung, &output) {
        if let SwingError::Encode {
            preserved: Some(ref temp),
            ..
        } = err
        {
            log::warn!("Intermediate WAV kept at {}", temp.display());
        }
        return Err(err.into());
    }

    log::info!("Done: {}", output.display());
    Ok(())
}
