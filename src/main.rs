use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use newscast::audio::{format_timestamp, PlaybackProgress};
use newscast::engine::remote::RemoteEngine;
use newscast::{persistence, Newscast};

#[derive(Parser, Debug)]
#[command(
    name = "newscast",
    about = "Turn news text into a spoken briefing and play it back"
)]
struct Args {
    /// News document to read. Plain text unless --mime says otherwise;
    /// omit to read from stdin.
    input: Option<PathBuf>,

    /// Raw news text passed inline instead of a file
    #[arg(long, conflicts_with = "input")]
    text: Option<String>,

    /// Declared mime type of the input document; non-text documents go
    /// through the extraction service
    #[arg(long, conflicts_with = "text")]
    mime: Option<String>,

    /// Voice for speech synthesis
    #[arg(long)]
    voice: Option<String>,

    /// Approximate briefing length in seconds
    #[arg(long)]
    length: Option<u32>,

    /// Save the synthesized briefing to a WAV file. Without a path the file
    /// goes to the configured save directory.
    #[arg(long, num_args = 0..=1)]
    save: Option<Option<PathBuf>>,

    /// Synthesize (and save) without playing
    #[arg(long)]
    no_play: bool,

    /// Playback volume, 0.0 to 1.0
    #[arg(long)]
    volume: Option<f32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut settings = persistence::load_settings();
    let overridden = args.voice.is_some() || args.length.is_some() || args.volume.is_some();
    if let Some(voice) = args.voice {
        settings.speech.voice = voice;
    }
    if let Some(length) = args.length {
        settings.script.target_seconds = length;
    }
    if let Some(volume) = args.volume {
        settings.general.volume = volume.clamp(0.0, 1.0);
    }
    if overridden {
        // Overrides become the new stored settings, like any settings change
        if let Err(e) = persistence::save_settings(&settings) {
            tracing::warn!("Failed to persist settings: {}", e);
        }
    }

    let save_path = resolve_save_path(&args.save, settings.general.save_dir.as_deref());

    let api_key = resolve_api_key(
        std::env::var("GEMINI_API_KEY").ok(),
        settings.general.api_key.as_deref(),
    )
    .context("No API key: set GEMINI_API_KEY or api_key in the settings file")?;
    let engine = Arc::new(RemoteEngine::new(api_key));

    let sink = Arc::new(|progress: PlaybackProgress| {
        let mut out = std::io::stdout();
        let _ = write!(
            out,
            "\r  {} [{:3.0}%] ",
            format_timestamp(progress.position_secs),
            progress.fraction * 100.0
        );
        if !progress.is_active && progress.fraction >= 1.0 {
            let _ = writeln!(out);
        }
        let _ = out.flush();
    });

    let newscast = Newscast::new(
        engine.clone(),
        engine.clone(),
        engine,
        settings,
        sink,
    )
    .context("Cannot play audio on this machine")?;

    // Interactive transport needs stdin free; piped input uses it up.
    let stdin_free = args.text.is_some() || args.input.is_some();

    let result = match (&args.text, &args.input) {
        (Some(text), _) => newscast.brief_from_text(text).await?,
        (None, Some(path)) => {
            let mime = args.mime.as_deref().unwrap_or("text/plain");
            if mime.starts_with("text/") {
                let text = std::fs::read_to_string(path)
                    .context(format!("Failed to read input file: {:?}", path))?;
                newscast.brief_from_text(&text).await?
            } else {
                let bytes = std::fs::read(path)
                    .context(format!("Failed to read input file: {:?}", path))?;
                newscast.brief_from_document(&bytes, mime).await?
            }
        }
        (None, None) => {
            let text = std::io::read_to_string(std::io::stdin())
                .context("Failed to read news text from stdin")?;
            newscast.brief_from_text(&text).await?
        }
    };

    println!("--- Script ({:.0}s) ---", result.duration_secs);
    println!("{}", result.script.trim());
    println!("-----------------------");

    if let Some(path) = &save_path {
        newscast.save_wav(path)?;
        println!("Saved to {:?}", path);
    }

    if args.no_play {
        return Ok(());
    }

    newscast.play()?;

    if stdin_free {
        run_transport_loop(&newscast)?;
    } else {
        // Stdin was the article; just let it play out
        while newscast.is_playing() {
            std::thread::sleep(std::time::Duration::from_millis(200));
        }
    }

    Ok(())
}

/// `--save path` saves there; bare `--save` picks a timestamped file in the
/// configured save directory (or the working directory); no flag, no save.
fn resolve_save_path(arg: &Option<Option<PathBuf>>, save_dir: Option<&str>) -> Option<PathBuf> {
    match arg {
        None => None,
        Some(Some(path)) => Some(path.clone()),
        Some(None) => {
            let dir = save_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            let stamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            Some(dir.join(format!("briefing-{}.wav", stamp)))
        }
    }
}

/// The environment variable wins over the stored key.
fn resolve_api_key(env_key: Option<String>, stored: Option<&str>) -> Option<String> {
    env_key
        .filter(|key| !key.is_empty())
        .or_else(|| stored.map(str::to_string))
}

fn run_transport_loop(newscast: &Newscast) -> Result<()> {
    println!("Transport: p = play/pause, r = restart, q = quit");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line?.trim() {
            "p" | "" => newscast.toggle_playback()?,
            "r" => {
                newscast.reset();
                newscast.play()?;
            }
            "q" => break,
            other => {
                println!("Unknown command: {:?}", other);
                continue;
            }
        }
        println!("{}", newscast.position_display());
    }
    Ok(())
}
