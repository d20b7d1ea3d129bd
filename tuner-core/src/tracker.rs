//! # Pitch Tracker Module
//!
//! The per-block entry point: scan frames, average the dominant voiced run,
//! quantize to the nearest note.

use serde::{Deserialize, Serialize};

use crate::config::TunerConfig;
use crate::error::{TunerError, TunerResult};
use crate::scanner::{FramePitch, FrameScanner};
use crate::tuning::{Note, NoteTable, cents_deviation, is_in_tune};
use crate::voiced::{average_voiced, longest_voiced_run};

/// The pitch of one analysis window and its nearest note.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchEstimate {
    /// Mean pitch of the longest voiced run in Hz
    pub frequency: f64,
    /// Nearest table note
    pub note: Note,
    /// `|frequency - note.frequency|` in Hz
    pub deviation_hz: f64,
    /// Frames in the voiced run the mean was taken over
    pub voiced_frames: usize,
}

impl PitchEstimate {
    pub fn cents(&self) -> f64 {
        cents_deviation(self.frequency, self.note.frequency)
    }

    pub fn is_in_tune(&self, tolerance_hz: f64) -> bool {
        is_in_tune(self.frequency, self.note.frequency, tolerance_hz)
    }

    /// Flattens the estimate into what a display needs.
    pub fn reading(&self, tolerance_hz: f64) -> TuningReading {
        TuningReading {
            label: self.note.name.clone(),
            exact_frequency: self.note.frequency,
            measured_frequency: self.frequency,
            in_tune: self.is_in_tune(tolerance_hz),
            cents: self.cents(),
        }
    }
}

/// Record handed to the presentation layer for each processed block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningReading {
    pub label: String,
    pub exact_frequency: f64,
    pub measured_frequency: f64,
    pub in_tune: bool,
    pub cents: f64,
}

/// Owns a frame scanner and a note table, and turns blocks into estimates.
#[derive(Debug)]
pub struct PitchTracker {
    table: NoteTable,
    tolerance_hz: f64,
    scanner: FrameScanner,
}

impl PitchTracker {
    pub fn new(config: &TunerConfig, table: NoteTable) -> TunerResult<Self> {
        config.validate()?;
        Ok(Self {
            scanner: FrameScanner::new(config.sample_rate, config.yin.clone())?,
            table,
            tolerance_hz: config.in_tune_tolerance_hz,
        })
    }

    /// Tracker with default settings and the standard note table.
    pub fn standard() -> TunerResult<Self> {
        Self::new(&TunerConfig::default(), NoteTable::standard().clone())
    }

    pub fn table(&self) -> &NoteTable {
        &self.table
    }

    pub fn tolerance_hz(&self) -> f64 {
        self.tolerance_hz
    }

    /// Per-frame analysis of a block, including harmonicity scores.
    pub fn scan(&mut self, samples: &[f32], sample_rate: u32) -> TunerResult<Vec<FramePitch>> {
        if sample_rate != self.scanner.sample_rate() {
            log::debug!(
                "Sample rate changed {} -> {} Hz, rebuilding scanner",
                self.scanner.sample_rate(),
                sample_rate
            );
            self.scanner = FrameScanner::new(sample_rate, self.scanner.config().clone())?;
        }
        let frame_len = self.scanner.config().frame_len;
        if samples.len() < frame_len {
            return Err(TunerError::InvalidFrameLength {
                len: samples.len(),
                required: frame_len,
            });
        }
        Ok(self.scanner.scan(samples))
    }

    /// Estimates the pitch of one block.
    ///
    /// # Returns
    /// * `Ok(estimate)` - Pitch of the dominant voiced run and its note
    /// * `Err(InvalidFrameLength)` - Block shorter than one frame
    /// * `Err(NoVoicedSegment)` - Nothing periodic in the block
    pub fn process_block(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
    ) -> TunerResult<PitchEstimate> {
        let frames = self.scan(samples, sample_rate)?;
        self.estimate(&frames)
    }

    /// Reduces already-scanned frames to an estimate.
    pub fn estimate(&self, frames: &[FramePitch]) -> TunerResult<PitchEstimate> {
        let pitches: Vec<f64> = frames.iter().map(|f| f.frequency).collect();
        let frequency = average_voiced(&pitches)?;
        let voiced_frames = longest_voiced_run(&pitches).map_or(0, |run| run.len());
        let note = self.table.quantize(frequency).clone();
        let deviation_hz = (frequency - note.frequency).abs();
        Ok(PitchEstimate {
            frequency,
            note,
            deviation_hz,
            voiced_frames,
        })
    }
}

/// One-shot estimate with default settings and the standard note table.
pub fn process_block(samples: &[f32], sample_rate: u32) -> TunerResult<PitchEstimate> {
    let config = TunerConfig {
        sample_rate,
        ..TunerConfig::default()
    };
    let mut tracker = PitchTracker::new(&config, NoteTable::standard().clone())?;
    tracker.process_block(samples, sample_rate)
}
