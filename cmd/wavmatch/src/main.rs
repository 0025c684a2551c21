//! wavmatch - counts repetitions of a reference phrase inside WAV files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use refrain_audio::wav;
use refrain_recognizer::{
    EventSink, RecognitionSession, SessionConfig, SessionEvent, SinkFunc, TemplateRegistry,
    WavDirStore, DEFAULT_SIMILARITY_THRESHOLD,
};

/// wavmatch - counts how many times a reference phrase occurs in audio.
///
/// References are mono 16-bit WAV files at the engine sample rate, one file
/// per phrase, named `<name>.wav` inside the references directory.
#[derive(Parser)]
#[command(name = "wavmatch")]
#[command(about = "Count repetitions of a reference phrase inside a WAV file")]
#[command(version)]
struct Cli {
    /// References directory
    #[arg(long, default_value = "refs", global = true)]
    refs: PathBuf,

    /// Output events as JSON lines (for piping)
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match an input WAV against a named reference
    Run {
        /// Reference name to match against
        #[arg(short, long)]
        target: String,

        /// Input WAV file (mono, 16-bit)
        #[arg(short, long)]
        input: PathBuf,

        /// Minimum similarity in [0, 1] that counts as a match
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f32,

        /// Stop after this many matches (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        limit: u32,
    },
    /// List usable references
    List,
    /// Import a WAV file as a new reference
    Add {
        /// Reference name
        name: String,
        /// Source WAV file (mono, 16-bit)
        input: PathBuf,
    },
    /// Delete a reference
    Remove {
        /// Reference name
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .init();
    }

    let cfg = SessionConfig::default();
    let store = WavDirStore::new(&cli.refs, cfg.mfcc.sample_rate);

    match &cli.command {
        Commands::Run {
            target,
            input,
            threshold,
            limit,
        } => run(&cli, store, cfg, target, input, *threshold, *limit),
        Commands::List => list(&cli, store, cfg),
        Commands::Add { name, input } => add(&cli, &store, name, input, cfg.mfcc.sample_rate),
        Commands::Remove { name } => remove(&store, name),
    }
}

fn run(
    cli: &Cli,
    store: WavDirStore,
    cfg: SessionConfig,
    target: &str,
    input: &Path,
    threshold: f32,
    limit: u32,
) -> Result<()> {
    let sample_rate = cfg.mfcc.sample_rate;
    let frame_size = cfg.mfcc.frame_size;
    let hop_size = cfg.mfcc.hop_size;
    let flush_frames = cfg.segmenter.silence_frames_threshold;

    let registry = Arc::new(TemplateRegistry::new(
        Box::new(store),
        cfg.mfcc.clone(),
        cfg.vad.clone(),
    ));
    if registry.reload() == 0 {
        anyhow::bail!("no usable references in {}", cli.refs.display());
    }

    let session = RecognitionSession::new(cfg, registry, event_sink(cli.json));
    session
        .start(target, threshold, limit)
        .with_context(|| format!("cannot start matching against {:?}", target))?;

    let samples = wav::read_wav(input, sample_rate)
        .with_context(|| format!("cannot read {}", input.display()))?;

    let mut utterances = 0u32;
    let mut start = 0;
    while start + frame_size <= samples.len() {
        if session.process_frame(&samples[start..start + frame_size]).is_some() {
            utterances += 1;
        }
        start += hop_size;
    }
    // Trailing silence flushes an utterance still in flight.
    let silence = vec![0.0f32; frame_size];
    for _ in 0..flush_frames {
        if session.process_frame(&silence).is_some() {
            utterances += 1;
        }
    }
    session.stop();
    let state = session.state();

    let count = session.match_count();
    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "target": target,
                "matches": count,
                "utterances": utterances,
                "state": state,
            })
        );
    } else {
        println!(
            "{}: {} match(es) from {} utterance(s), ended {:?}",
            target, count, utterances, state
        );
    }
    Ok(())
}

fn event_sink(json: bool) -> Box<dyn EventSink> {
    if json {
        Box::new(SinkFunc(|event: &SessionEvent| {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{}", line);
            }
        }))
    } else {
        Box::new(SinkFunc(|event: &SessionEvent| match event {
            SessionEvent::Match {
                similarity,
                matched,
                count,
            } => {
                if *matched {
                    println!("match #{} (similarity {:.3})", count, similarity);
                } else {
                    println!("no match (similarity {:.3})", similarity);
                }
            }
            SessionEvent::LimitReached { count } => {
                println!("limit reached after {} match(es)", count);
            }
            SessionEvent::Error { message, .. } => {
                eprintln!("error: {}", message);
            }
            _ => {}
        }))
    }
}

fn list(cli: &Cli, store: WavDirStore, cfg: SessionConfig) -> Result<()> {
    let registry = TemplateRegistry::new(Box::new(store), cfg.mfcc, cfg.vad);
    registry.reload();
    let names = registry.names();

    if cli.json {
        println!("{}", serde_json::to_string(&names)?);
    } else if names.is_empty() {
        println!("no references in {}", cli.refs.display());
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    Ok(())
}

fn add(cli: &Cli, store: &WavDirStore, name: &str, input: &Path, sample_rate: u32) -> Result<()> {
    let samples = wav::read_wav(input, sample_rate)
        .with_context(|| format!("cannot read {}", input.display()))?;
    std::fs::create_dir_all(&cli.refs)
        .with_context(|| format!("cannot create {}", cli.refs.display()))?;
    let stored = store
        .save(name, &samples)
        .with_context(|| format!("cannot save reference {:?}", name))?;
    println!(
        "added {:?} ({:.2}s)",
        stored,
        samples.len() as f64 / sample_rate as f64
    );
    if stored != name {
        println!("note: {:?} already exists, stored as {:?}", name, stored);
    }
    Ok(())
}

fn remove(store: &WavDirStore, name: &str) -> Result<()> {
    store
        .delete(name)
        .with_context(|| format!("cannot remove reference {:?}", name))?;
    println!("removed {:?}", name);
    Ok(())
}
