//! # Frame Scanner Module
//!
//! Slices a block into overlapping frames and runs the YIN steps on each,
//! producing one pitch candidate per frame in time order.

use crate::config::YinConfig;
use crate::difference::DifferenceEngine;
use crate::error::{TunerError, TunerResult};
use crate::pitch::{aperiodicity, cmndf_minimum, cumulative_mean_normalized_into, find_period};

/// Analysis of a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePitch {
    /// Start of the frame in seconds from the start of the block
    pub time: f64,
    /// Detected fundamental in Hz, or 0.0 when unvoiced
    pub frequency: f64,
    /// CMNDF at the chosen lag, or the frame's CMNDF minimum when unvoiced.
    /// Lower is more periodic.
    pub harmonicity: f64,
    /// `sr / argmin(CMNDF)` when the global minimum lies above `t_min`
    pub argmin_frequency: Option<f64>,
}

impl FramePitch {
    fn unvoiced(time: f64) -> Self {
        Self {
            time,
            frequency: 0.0,
            harmonicity: 1.0,
            argmin_frequency: None,
        }
    }

    pub fn is_voiced(&self) -> bool {
        self.frequency > 0.0
    }
}

/// Number of frames `scan` produces for a signal of `len` samples.
pub fn frame_count(len: usize, frame_len: usize, hop: usize) -> usize {
    if len < frame_len {
        0
    } else {
        (len - frame_len) / hop + 1
    }
}

/// Drives the difference engine, normalizer and period search over frames.
///
/// Holds its scratch buffers, so one scanner should be reused across blocks.
#[derive(Debug)]
pub struct FrameScanner {
    sample_rate: u32,
    config: YinConfig,
    t_min: usize,
    t_max: usize,
    engine: DifferenceEngine,
    df: Vec<f64>,
    cmndf: Vec<f64>,
}

impl FrameScanner {
    pub fn new(sample_rate: u32, config: YinConfig) -> TunerResult<Self> {
        if sample_rate == 0 {
            return Err(TunerError::InvalidSampleRate(sample_rate));
        }
        config.validate()?;
        let t_min = config.min_lag(sample_rate);
        let t_max = config.max_lag(sample_rate);
        if t_max <= t_min {
            return Err(TunerError::InvalidConfig(format!(
                "empty lag range {}..{} at {} Hz",
                t_min, t_max, sample_rate
            )));
        }
        log::debug!(
            "Frame scanner: {} Hz, frame {} / hop {}, lags {}..{}",
            sample_rate,
            config.frame_len,
            config.hop,
            t_min,
            t_max
        );
        Ok(Self {
            sample_rate,
            t_min,
            t_max,
            engine: DifferenceEngine::new(),
            df: Vec::with_capacity(t_max + 1),
            cmndf: Vec::with_capacity(t_max + 1),
            config,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn config(&self) -> &YinConfig {
        &self.config
    }

    /// Lag search range `(t_min, t_max)`.
    pub fn lag_range(&self) -> (usize, usize) {
        (self.t_min, self.t_max)
    }

    /// Runs the YIN steps on one frame.
    ///
    /// # Returns
    /// * `Ok(pitch)` - Voiced or unvoiced analysis; `time` is left at 0
    /// * `Err(InvalidFrameLength)` - Empty frame
    /// * `Err(DegenerateInput)` - Frame energy below the configured floor
    pub fn analyze_frame(&mut self, frame: &[f32]) -> TunerResult<FramePitch> {
        if frame.is_empty() {
            return Err(TunerError::InvalidFrameLength {
                len: 0,
                required: 1,
            });
        }

        // --- Energy gate ---
        let energy: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
        if !(energy > self.config.energy_floor) {
            return Err(TunerError::DegenerateInput);
        }

        self.engine.compute(frame, self.t_max, &mut self.df);
        cumulative_mean_normalized_into(&self.df, &mut self.cmndf);
        let mut period = find_period(
            &self.cmndf,
            self.t_min,
            self.t_max,
            self.config.harmonic_threshold,
        );
        // The CMNDF dips in the low-overlap tail for any input; noise is
        // caught here instead.
        if period != 0 {
            let score = aperiodicity(self.df[period], period, frame.len(), energy);
            if !(score <= self.config.aperiodicity_limit) {
                log::trace!("Lag {} rejected, aperiodicity {:.3}", period, score);
                period = 0;
            }
        }

        let sr = self.sample_rate as f64;
        let minimum = cmndf_minimum(&self.cmndf);
        let argmin_frequency = minimum
            .filter(|&(tau, _)| tau > self.t_min)
            .map(|(tau, _)| sr / tau as f64);

        let (frequency, harmonicity) = if period != 0 {
            (sr / period as f64, self.cmndf[period])
        } else {
            (0.0, minimum.map_or(1.0, |(_, v)| v))
        };

        Ok(FramePitch {
            time: 0.0,
            frequency,
            harmonicity,
            argmin_frequency,
        })
    }

    /// Analyzes every full frame of `signal`.
    ///
    /// Returns `frame_count(signal.len(), frame_len, hop)` entries; a signal
    /// shorter than one frame gives an empty vector. Silent frames are
    /// recorded as unvoiced.
    pub fn scan(&mut self, signal: &[f32]) -> Vec<FramePitch> {
        let frame_len = self.config.frame_len;
        let hop = self.config.hop;
        let count = frame_count(signal.len(), frame_len, hop);
        let sr = self.sample_rate as f64;

        let mut pitches = Vec::with_capacity(count);
        for i in 0..count {
            let start = i * hop;
            let time = start as f64 / sr;
            let frame = &signal[start..start + frame_len];
            let pitch = match self.analyze_frame(frame) {
                Ok(pitch) => FramePitch { time, ..pitch },
                Err(e) => {
                    log::trace!("Frame {} at {:.3}s unvoiced: {}", i, time, e);
                    FramePitch::unvoiced(time)
                }
            };
            pitches.push(pitch);
        }
        pitches
    }
}

/// One-shot scan of `signal` with a fresh scanner.
pub fn scan(signal: &[f32], sample_rate: u32, config: &YinConfig) -> TunerResult<Vec<FramePitch>> {
    Ok(FrameScanner::new(sample_rate, config.clone())?.scan(signal))
}
