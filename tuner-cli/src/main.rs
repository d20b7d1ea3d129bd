//! # Tuner - command-line instrument tuner
//!
//! ## Architecture
//! - **Main Thread**: Parses arguments and prints readings
//! - **Audio Thread**: Owns the capture stream and the tuning session
//! - **Communication**: Crossbeam channels; the capture callback keeps only
//!   the newest completed block for the audio thread

mod capture;
mod playback;
mod report;
mod settings;
mod wav;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tuner_core::{BlockOutcome, PitchTracker, TunerConfig, TunerSession, block_channel};

use settings::{Overrides, Settings};

#[derive(Parser, Debug)]
#[command(name = "tuner", version, about = "Monophonic instrument tuner")]
struct Cli {
    /// JSON file with analysis settings
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON file with an alternate note table
    #[arg(long, global = true, value_name = "FILE")]
    notes: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tune from the default input device (the default command)
    Listen {
        /// Stop after this many analyzed blocks
        #[arg(long)]
        blocks: Option<u64>,
        /// Print readings as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Analyze a WAV file block by block
    Analyze {
        path: PathBuf,
        #[arg(long)]
        json: bool,
        /// Also print every analysis frame
        #[arg(long)]
        frames: bool,
    },
    /// Play a reference note from a WAV file or an open guitar string
    Play {
        path: Option<PathBuf>,
        /// Open string to play (E2, A2, D3, G3, B3, E4)
        #[arg(long, conflicts_with = "path")]
        string: Option<String>,
        /// Directory holding the open-string recordings
        #[arg(long, default_value = "GuitarNotes")]
        dir: PathBuf,
    },
    /// Print the note table in use
    Notes,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = settings::load(cli.config.as_deref(), cli.notes.as_deref(), &cli.overrides)?;

    match cli.command.unwrap_or(Command::Listen { blocks: None, json: false }) {
        Command::Listen { blocks, json } => listen(settings, blocks, json),
        Command::Analyze { path, json, frames } => analyze(settings, &path, json, frames),
        Command::Play { path, string, dir } => match (path, string) {
            (Some(path), _) => playback::play_file(&path),
            (None, Some(string)) => playback::play_string(&dir, &string),
            (None, None) => bail!("play needs a WAV file or --string"),
        },
        Command::Notes => {
            report::print_table(&settings.table);
            Ok(())
        }
    }
}

/// Handle to the audio thread.
struct AudioWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl AudioWorker {
    /// Spawns the audio thread and waits until capture is running.
    ///
    /// Every block the session handles is sent to `outcome_tx`.
    fn spawn(settings: Settings, outcome_tx: Sender<BlockOutcome>) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);

        let thread_handle = thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || {
                if let Err(e) = run_audio_thread(settings, outcome_tx, shutdown_rx, &ready_tx) {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .context("Failed to spawn the audio thread")?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                shutdown_tx,
                thread_handle: Some(thread_handle),
            }),
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                Err(e.context("Failed to start audio capture"))
            }
            Err(_) => Err(anyhow!("Audio thread exited during startup")),
        }
    }

    fn shutdown(mut self) {
        log::debug!("Shutting down audio worker");
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("Audio thread panicked");
            }
        }
    }
}

fn run_audio_thread(
    settings: Settings,
    outcome_tx: Sender<BlockOutcome>,
    shutdown_rx: Receiver<()>,
    ready_tx: &Sender<Result<()>>,
) -> Result<()> {
    let (publisher, receiver) = block_channel();
    let (stream, sample_rate) = capture::start_audio_capture(
        publisher,
        settings.config.sample_rate,
        settings.config.block_seconds,
    )?;

    let config = TunerConfig {
        sample_rate,
        ..settings.config
    };
    let tracker = PitchTracker::new(&config, settings.table)?;
    let mut session = TunerSession::new(tracker);
    session.start();
    let _ = ready_tx.send(Ok(()));

    // A block should arrive every block_seconds; allow one extra period
    let patience = Duration::from_secs_f64(config.block_seconds * 2.0);
    log::info!(
        "Listening in {:.1} s blocks against {} notes",
        config.block_seconds,
        session.tracker().table().len()
    );

    loop {
        crossbeam_channel::select! {
            recv(receiver.channel()) -> msg => match msg {
                Ok(block) => {
                    log::debug!("Block #{} ({:.2} s)", block.sequence, block.duration());
                    if outcome_tx.send(session.handle_block(Some(block))).is_err() {
                        break;
                    }
                }
                Err(_) => {
                    log::warn!("Audio channel closed");
                    break;
                }
            },
            recv(shutdown_rx) -> _ => {
                log::debug!("Received shutdown signal");
                break;
            },
            default(patience) => {
                if outcome_tx.send(session.handle_block(None)).is_err() {
                    break;
                }
            },
        }
    }

    session.stop();
    if let Err(e) = stream.pause() {
        log::warn!("Error pausing stream: {}", e);
    }
    drop(stream);
    log::debug!("Audio thread finished after {} blocks", session.processed());
    Ok(())
}

fn listen(settings: Settings, blocks: Option<u64>, json: bool) -> Result<()> {
    let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded::<BlockOutcome>();
    let worker = AudioWorker::spawn(settings, outcome_tx)?;

    let mut analyzed = 0u64;
    for outcome in outcome_rx.iter() {
        if report::print_outcome(&outcome, json)? {
            analyzed += 1;
        }
        if blocks.is_some_and(|limit| analyzed >= limit) {
            break;
        }
    }

    worker.shutdown();
    Ok(())
}

fn analyze(settings: Settings, path: &Path, json: bool, frames: bool) -> Result<()> {
    let (samples, sample_rate) = wav::read_mono(path)?;
    let config = TunerConfig {
        sample_rate,
        ..settings.config
    };
    config.validate().context("Invalid tuner configuration")?;
    let mut tracker = PitchTracker::new(&config, settings.table)?;

    let block_len = config.block_len();
    log::info!(
        "Analyzing {} ({:.1} s) in {} sample blocks",
        path.display(),
        samples.len() as f64 / sample_rate as f64,
        block_len
    );

    for (sequence, block) in samples.chunks(block_len).enumerate() {
        let result = if frames {
            tracker.scan(block, sample_rate).and_then(|scanned| {
                report::print_frames(&scanned);
                tracker.estimate(&scanned)
            })
        } else {
            tracker.process_block(block, sample_rate)
        };
        let outcome = BlockOutcome::from_result(sequence as u64, result, tracker.tolerance_hz());
        report::print_outcome(&outcome, json)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let args = ["tuner", "--notes", "bass.json", "listen", "--blocks", "3"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.notes, Some(PathBuf::from("bass.json")));
        assert!(matches!(cli.command, Some(Command::Listen { blocks: Some(3), json: false })));

        let args = ["tuner", "analyze", "take.wav", "--json", "--config", "c.json"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
        assert!(matches!(cli.command, Some(Command::Analyze { json: true, frames: false, .. })));
    }

    #[test]
    fn test_analysis_overrides_apply_to_config() {
        let args = ["tuner", "analyze", "take.wav", "--f0-min", "30", "--threshold", "0.2"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.overrides.f0_min, Some(30.0));
        assert_eq!(cli.overrides.f0_max, None);

        let args = ["tuner", "--block-seconds", "2", "--tolerance", "0.5"];
        let cli = Cli::try_parse_from(args).unwrap();
        let mut config = TunerConfig::default();
        cli.overrides.apply(&mut config);
        assert_eq!(config.block_seconds, 2.0);
        assert_eq!(config.in_tune_tolerance_hz, 0.5);
        assert_eq!(config.yin, TunerConfig::default().yin);
    }

    #[test]
    fn test_play_accepts_a_string_name() {
        let cli = Cli::try_parse_from(["tuner", "play", "--string", "D3"]).unwrap();
        match cli.command {
            Some(Command::Play { path, string, dir }) => {
                assert_eq!(path, None);
                assert_eq!(string.as_deref(), Some("D3"));
                assert_eq!(dir, PathBuf::from("GuitarNotes"));
            }
            other => panic!("expected play, got {:?}", other),
        }
        assert!(Cli::try_parse_from(["tuner", "play", "a.wav", "--string", "D3"]).is_err());
    }

    #[test]
    fn test_no_subcommand_means_listen() {
        let cli = Cli::try_parse_from(["tuner"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_clap_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
