//! # Configuration Module
//!
//! Analysis parameters for the pitch pipeline and the capture front end.
//! Every field has a default, so partial JSON files deserialize cleanly.

use serde::{Deserialize, Serialize};

use crate::error::{TunerError, TunerResult};
use crate::tuning::IN_TUNE_TOLERANCE_HZ;

/// Sample rate the tuner captures and plays back at.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Parameters of the frame-by-frame YIN analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YinConfig {
    /// Samples per analysis frame (20 ms at 44.1 kHz)
    pub frame_len: usize,
    /// Samples between consecutive frame starts
    pub hop: usize,
    /// Lowest plausible fundamental in Hz
    pub f0_min: f64,
    /// Highest plausible fundamental in Hz
    pub f0_max: f64,
    /// CMNDF value a lag must fall below to count as a period
    pub harmonic_threshold: f64,
    /// Frames whose sum of squared samples is below this are treated as silence
    pub energy_floor: f64,
    /// Largest [`aperiodicity`](crate::pitch::aperiodicity) accepted at the
    /// chosen lag; noise sits near 1
    pub aperiodicity_limit: f64,
}

impl Default for YinConfig {
    fn default() -> Self {
        Self {
            frame_len: 882,
            hop: 441,
            f0_min: 50.0,
            f0_max: 500.0,
            harmonic_threshold: 0.1,
            energy_floor: 1e-9,
            aperiodicity_limit: 0.25,
        }
    }
}

impl YinConfig {
    /// Checks that the parameters describe a searchable lag range.
    pub fn validate(&self) -> TunerResult<()> {
        if self.frame_len < 2 {
            return Err(TunerError::InvalidConfig(format!(
                "frame_len must be at least 2, got {}",
                self.frame_len
            )));
        }
        if self.hop == 0 {
            return Err(TunerError::InvalidConfig("hop must be positive".into()));
        }
        if !(self.f0_min > 0.0 && self.f0_min.is_finite()) {
            return Err(TunerError::InvalidConfig(format!(
                "f0_min must be a positive frequency, got {}",
                self.f0_min
            )));
        }
        if !(self.f0_max > self.f0_min && self.f0_max.is_finite()) {
            return Err(TunerError::InvalidConfig(format!(
                "f0_max ({}) must exceed f0_min ({})",
                self.f0_max, self.f0_min
            )));
        }
        if !(self.harmonic_threshold > 0.0 && self.harmonic_threshold < 1.0) {
            return Err(TunerError::InvalidConfig(format!(
                "harmonic_threshold must lie in (0, 1), got {}",
                self.harmonic_threshold
            )));
        }
        if !(self.energy_floor >= 0.0) {
            return Err(TunerError::InvalidConfig(format!(
                "energy_floor must be non-negative, got {}",
                self.energy_floor
            )));
        }
        if !(self.aperiodicity_limit > 0.0 && self.aperiodicity_limit.is_finite()) {
            return Err(TunerError::InvalidConfig(format!(
                "aperiodicity_limit must be positive, got {}",
                self.aperiodicity_limit
            )));
        }
        Ok(())
    }

    /// Shortest lag searched, `floor(sr / f0_max)`.
    pub fn min_lag(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 / self.f0_max).floor() as usize
    }

    /// Longest lag searched, `floor(sr / f0_min)`.
    pub fn max_lag(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 / self.f0_min).floor() as usize
    }
}

/// Settings for a tuning session: capture format plus analysis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub sample_rate: u32,
    /// Length of one analysis window delivered by the capture side
    pub block_seconds: f64,
    /// Largest deviation in Hz still reported as in tune
    pub in_tune_tolerance_hz: f64,
    pub yin: YinConfig,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_seconds: 4.0,
            in_tune_tolerance_hz: IN_TUNE_TOLERANCE_HZ,
            yin: YinConfig::default(),
        }
    }
}

impl TunerConfig {
    pub fn validate(&self) -> TunerResult<()> {
        if self.sample_rate == 0 {
            return Err(TunerError::InvalidSampleRate(self.sample_rate));
        }
        if !(self.block_seconds > 0.0 && self.block_seconds.is_finite()) {
            return Err(TunerError::InvalidConfig(format!(
                "block_seconds must be positive, got {}",
                self.block_seconds
            )));
        }
        if !(self.in_tune_tolerance_hz >= 0.0) {
            return Err(TunerError::InvalidConfig(format!(
                "in_tune_tolerance_hz must be non-negative, got {}",
                self.in_tune_tolerance_hz
            )));
        }
        self.yin.validate()?;
        if self.block_len() < self.yin.frame_len {
            return Err(TunerError::InvalidConfig(format!(
                "a block of {} samples cannot hold one {}-sample frame",
                self.block_len(),
                self.yin.frame_len
            )));
        }
        Ok(())
    }

    /// Samples per capture block.
    pub fn block_len(&self) -> usize {
        (self.block_seconds * self.sample_rate as f64).round() as usize
    }
}
