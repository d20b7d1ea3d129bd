// tuner-core/src/lib.rs

//! The core logic for the instrument tuner.
//! This crate is responsible for pitch estimation of captured audio blocks
//! and for mapping pitches onto a note table. It is completely headless and
//! contains no audio device or display code.
//!
//! ```rust,ignore
//! use tuner_core::process_block;
//!
//! let estimate = process_block(&samples, 44_100)?;
//! println!("{} ({:.2} Hz)", estimate.note.name, estimate.frequency);
//! ```

pub mod config;
pub mod difference;
pub mod handoff;
pub mod pitch;
pub mod scanner;
pub mod session;
pub mod tracker;
pub mod tuning;
pub mod voiced;

mod error;

pub use config::{TunerConfig, YinConfig};
pub use error::{TunerError, TunerResult};
pub use handoff::{AudioBlock, BlockAssembler, BlockPublisher, BlockReceiver, block_channel};
pub use scanner::{FramePitch, FrameScanner};
pub use session::{BlockOutcome, SessionState, TunerSession};
pub use tracker::{PitchEstimate, PitchTracker, TuningReading, process_block};
pub use tuning::{Note, NoteTable, IN_TUNE_TOLERANCE_HZ};
