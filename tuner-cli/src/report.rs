//! Formats readings for the terminal.
//!
//! Readings go to stdout, one per line, as text or JSON. Blocks without a
//! pitch only produce a log line.

use anyhow::Result;
use serde::Serialize;
use tuner_core::{BlockOutcome, FramePitch, NoteTable, TuningReading};

#[derive(Serialize)]
struct JsonReading<'a> {
    sequence: u64,
    #[serde(flatten)]
    reading: &'a TuningReading,
}

/// One display line for a reading.
pub fn format_reading(reading: &TuningReading) -> String {
    format!(
        "{:<8} {:>8.2} Hz  (target {:.2} Hz, {:+.1} cents)  {}",
        reading.label,
        reading.measured_frequency,
        reading.exact_frequency,
        reading.cents,
        if reading.in_tune { "IN TUNE" } else { "" }
    )
    .trim_end()
    .to_string()
}

/// Prints `outcome`. Returns `true` if it carried an analyzed block.
pub fn print_outcome(outcome: &BlockOutcome, json: bool) -> Result<bool> {
    match outcome {
        BlockOutcome::Reading { sequence, reading } => {
            if json {
                let line = JsonReading {
                    sequence: *sequence,
                    reading,
                };
                println!("{}", serde_json::to_string(&line)?);
            } else {
                println!("{}", format_reading(reading));
            }
            Ok(true)
        }
        BlockOutcome::NoPitch { sequence, reason } => {
            log::info!("Block #{}: no pitch ({})", sequence, reason);
            Ok(true)
        }
        BlockOutcome::Missing => {
            log::warn!("No audio block arrived in time");
            Ok(false)
        }
        BlockOutcome::Ignored => Ok(false),
    }
}

/// Per-frame dump used by `analyze --frames`.
pub fn print_frames(frames: &[FramePitch]) {
    for frame in frames {
        if frame.is_voiced() {
            println!(
                "{:>8.3} s  {:>8.2} Hz  cmndf {:.3}",
                frame.time, frame.frequency, frame.harmonicity
            );
        } else {
            println!("{:>8.3} s  {:>8}     cmndf {:.3}", frame.time, "-", frame.harmonicity);
        }
    }
}

pub fn print_table(table: &NoteTable) {
    for note in table.notes() {
        println!("{:<8} {:>8.2} Hz", note.name, note.frequency);
    }
}
