//! Loads the optional JSON config and note table named on the command line.

use anyhow::{Context, Result};
use clap::Args;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tuner_core::{NoteTable, TunerConfig};

/// Everything a command needs to build a tracker.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: TunerConfig,
    pub table: NoteTable,
}

/// Command-line values that take precedence over the config file.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    /// CMNDF threshold for accepting a period
    #[arg(long, global = true)]
    pub threshold: Option<f64>,
    /// Lowest fundamental searched, in Hz
    #[arg(long, global = true)]
    pub f0_min: Option<f64>,
    /// Highest fundamental searched, in Hz
    #[arg(long, global = true)]
    pub f0_max: Option<f64>,
    /// Length of one analysis block in seconds
    #[arg(long, global = true)]
    pub block_seconds: Option<f64>,
    /// Largest deviation in Hz still shown as in tune
    #[arg(long, global = true)]
    pub tolerance: Option<f64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut TunerConfig) {
        if let Some(threshold) = self.threshold {
            config.yin.harmonic_threshold = threshold;
        }
        if let Some(f0_min) = self.f0_min {
            config.yin.f0_min = f0_min;
        }
        if let Some(f0_max) = self.f0_max {
            config.yin.f0_max = f0_max;
        }
        if let Some(block_seconds) = self.block_seconds {
            config.block_seconds = block_seconds;
        }
        if let Some(tolerance) = self.tolerance {
            config.in_tune_tolerance_hz = tolerance;
        }
    }
}

/// Reads `config_path` and `notes_path`, falling back to the built-in
/// defaults for whichever is absent, then applies `overrides`.
pub fn load(
    config_path: Option<&Path>,
    notes_path: Option<&Path>,
    overrides: &Overrides,
) -> Result<Settings> {
    let mut config = match config_path {
        Some(path) => {
            let config: TunerConfig = read_json(path)?;
            log::info!("Loaded settings from {}", path.display());
            config
        }
        None => TunerConfig::default(),
    };
    overrides.apply(&mut config);
    config
        .validate()
        .context("Invalid tuner configuration")?;

    let table = match notes_path {
        Some(path) => {
            let table: NoteTable = read_json(path)?;
            log::info!("Loaded {} notes from {}", table.len(), path.display());
            table
        }
        None => NoteTable::standard().clone(),
    };

    Ok(Settings { config, table })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
}
