//! medireader: clean, segment, synthesize and read articles from a terminal.
//!
//! Usage:
//!   medireader clean article.txt -o clean.txt
//!   medireader segment clean.txt
//!   medireader synthesize clean.txt -o article.wav --voice Kore --wpm 300
//!   medireader read clean.txt --start 120
//!
//! Synthesis needs `GEMINI_API_KEY` (or `api_key` in the config file).
//! Log verbosity follows `RUST_LOG` (default `medireader=info`).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use medireader::clean::TextCleaner;
use medireader::engine::PlaybackState;
use medireader::present::{focal_split, reading_progress};
use medireader::prefetch::BatchProgress;
use medireader::{ClockOutput, Document, ReaderConfig, ReaderSession, SourceEvent};

/// Frame period of the read loop (about 60 Hz).
const FRAME: Duration = Duration::from_millis(16);

#[derive(Parser)]
#[command(name = "medireader", about = "Word-by-word article reader with synthesized speech")]
struct Cli {
    /// JSON config file; every field is optional.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Strip references, metadata and citations from an article.
    Clean {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the word and paragraph structure as JSON.
    Segment { input: PathBuf },
    /// Synthesize every paragraph and write one WAV file.
    Synthesize {
        input: PathBuf,
        #[arg(short, long, default_value = "output.wav")]
        output: PathBuf,
        #[command(flatten)]
        voice: VoiceArgs,
    },
    /// Synthesize, then show the text one word at a time in step with the audio clock.
    Read {
        input: PathBuf,
        /// Word to start from.
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[command(flatten)]
        voice: VoiceArgs,
    },
}

#[derive(Args)]
struct VoiceArgs {
    #[arg(long)]
    voice: Option<String>,
    #[arg(long)]
    wpm: Option<u32>,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "medireader=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ReaderConfig> {
    let config = match path {
        Some(path) => ReaderConfig::from_file(path)?,
        None => ReaderConfig::default(),
    };
    Ok(config.with_env())
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}

fn print_progress(p: BatchProgress) {
    let eta = p
        .eta
        .map(|d| format!(", {}m {:02}s left", d.as_secs() / 60, d.as_secs() % 60))
        .unwrap_or_default();
    eprint!("\rProcessing audio: {:>3.0}% ({}/{}){}   ", p.percent, p.completed, p.total, eta);
    if p.completed == p.total {
        eprintln!();
    }
}

async fn prepare(config: ReaderConfig, voice: VoiceArgs, text: &str, clock: ClockOutput) -> Result<ReaderSession> {
    let mut session = ReaderSession::new(config);
    session.set_text(text);
    if let Some(v) = voice.voice.as_deref() {
        session.set_voice(v)?;
    }
    if let Some(wpm) = voice.wpm {
        session.set_wpm(wpm)?;
    }

    let summary = session.prepare_remote(clock, print_progress).await?;
    if let Some(notice) = summary.notice() {
        eprintln!("{}", notice);
    }
    Ok(session)
}

fn cmd_clean(config: &ReaderConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    let cleaned = TextCleaner::with_config(config.cleaner).process(&read_input(input)?);
    match output {
        Some(path) => std::fs::write(path, cleaned)
            .with_context(|| format!("Cannot write {}", path.display()))?,
        None => println!("{}", cleaned),
    }
    Ok(())
}

fn cmd_segment(input: &Path) -> Result<()> {
    let doc = Document::segment(&medireader::clean::strip_markdown(&read_input(input)?));
    let summary = serde_json::json!({
        "words": doc.word_count(),
        "paragraphs": doc.paragraph_count(),
        "paragraph_starts": doc.paragraph_starts(),
        "paragraph_words": (0..doc.paragraph_count())
            .map(|p| doc.paragraph_words(p).len())
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn render(session: &ReaderSession) -> Result<()> {
    let engine = session.engine();
    let Some(word) = engine.window().current else { return Ok(()) };
    let split = focal_split(word);
    let progress = reading_progress(
        engine.cursor().word_index,
        session.document().word_count(),
        session.config().wpm,
    );
    let mut out = std::io::stdout().lock();
    write!(
        out,
        "\r\x1b[2K{:>20}\x1b[1;31m{}\x1b[0m{:<20} {:>5.1}%  {} left",
        split.prefix, split.focal, split.suffix, progress.percent, progress
    )?;
    out.flush()?;
    Ok(())
}

async fn cmd_read(config: ReaderConfig, voice: VoiceArgs, input: &Path, start: usize) -> Result<()> {
    let clock = ClockOutput::new();
    let mut session = prepare(config, voice, &read_input(input)?, clock.clone()).await?;

    session.engine_mut().seek(start)?;
    session.engine_mut().play()?;
    render(&session)?;

    let mut ticker = tokio::time::interval(FRAME);
    while session.engine().state() == PlaybackState::Playing {
        ticker.tick().await;
        let mut changed = session.engine_mut().handle(SourceEvent::Frame)?;
        if let Some(clip) = clock.ended_clip() {
            changed |= session.engine_mut().handle(SourceEvent::ClipEnded { clip })?;
        }
        if changed {
            render(&session)?;
        }
    }
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Clean { input, output } => cmd_clean(&config, &input, output.as_deref()),
        Command::Segment { input } => cmd_segment(&input),
        Command::Synthesize { input, output, voice } => {
            let session = prepare(config, voice, &read_input(&input)?, ClockOutput::new()).await?;
            session.export_wav(&output)?;
            println!("Saved {}", output.display());
            Ok(())
        }
        Command::Read { input, start, voice } => cmd_read(config, voice, &input, start).await,
    }
}
