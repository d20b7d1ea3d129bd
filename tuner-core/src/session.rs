//! # Tuning Session Module
//!
//! The start/stop state of a tuning session. Each block handed in yields a
//! [`BlockOutcome`] by value; the session keeps no result of its own.

use crate::error::{TunerError, TunerResult};
use crate::handoff::AudioBlock;
use crate::tracker::{PitchEstimate, PitchTracker, TuningReading};

/// Whether the session is currently analyzing captured audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not capturing; incoming blocks are ignored
    Idle,
    /// Analyzing every block delivered by the capture side
    Capturing,
}

/// What happened to one delivered block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome {
    /// A pitch was found; ready for display
    Reading { sequence: u64, reading: TuningReading },
    /// The block was analyzed but produced no pitch
    NoPitch { sequence: u64, reason: TunerError },
    /// Capturing, but no completed block was available
    Missing,
    /// The session is idle
    Ignored,
}

impl BlockOutcome {
    /// Outcome of analyzing block `sequence`.
    pub fn from_result(
        sequence: u64,
        result: TunerResult<PitchEstimate>,
        tolerance_hz: f64,
    ) -> Self {
        match result {
            Ok(estimate) => BlockOutcome::Reading {
                sequence,
                reading: estimate.reading(tolerance_hz),
            },
            Err(reason) => BlockOutcome::NoPitch { sequence, reason },
        }
    }
}

/// State machine wrapping a [`PitchTracker`].
#[derive(Debug)]
pub struct TunerSession {
    state: SessionState,
    tracker: PitchTracker,
    processed: u64,
}

impl TunerSession {
    pub fn new(tracker: PitchTracker) -> Self {
        Self {
            state: SessionState::Idle,
            tracker,
            processed: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Blocks analyzed since the session was created.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn tracker(&self) -> &PitchTracker {
        &self.tracker
    }

    /// Idle -> Capturing. Returns `false` if already capturing.
    pub fn start(&mut self) -> bool {
        match self.state {
            SessionState::Idle => {
                log::debug!("Session: Idle -> Capturing");
                self.state = SessionState::Capturing;
                true
            }
            SessionState::Capturing => false,
        }
    }

    /// Capturing -> Idle. Returns `false` if already idle.
    pub fn stop(&mut self) -> bool {
        match self.state {
            SessionState::Capturing => {
                log::debug!("Session: Capturing -> Idle after {} blocks", self.processed);
                self.state = SessionState::Idle;
                true
            }
            SessionState::Idle => false,
        }
    }

    /// Analyzes `block` if the session is capturing.
    pub fn handle_block(&mut self, block: Option<AudioBlock>) -> BlockOutcome {
        if self.state == SessionState::Idle {
            return BlockOutcome::Ignored;
        }
        let Some(block) = block else {
            return BlockOutcome::Missing;
        };

        self.processed += 1;
        let result = self.tracker.process_block(&block.samples, block.sample_rate);
        BlockOutcome::from_result(block.sequence, result, self.tracker.tolerance_hz())
    }
}
