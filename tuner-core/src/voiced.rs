//! Reduces per-frame pitches to one estimate for the block.
//!
//! Only the longest contiguous voiced run is trusted, so breath noise or a
//! pick transient between two voiced stretches cannot drag the average
//! toward a wrong pitch.

use std::ops::Range;

use crate::error::{TunerError, TunerResult};

/// Index range of the longest run of strictly positive pitches.
///
/// Ties go to the earliest run. Returns `None` when no entry is voiced.
pub fn longest_voiced_run(pitches: &[f64]) -> Option<Range<usize>> {
    let mut best: Option<Range<usize>> = None;
    let mut start = None;

    // A trailing unvoiced sentinel closes a run that reaches the end.
    for (i, voiced) in pitches
        .iter()
        .map(|&p| p > 0.0)
        .chain(std::iter::once(false))
        .enumerate()
    {
        match (voiced, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if best.as_ref().map_or(true, |b| i - s > b.len()) {
                    best = Some(s..i);
                }
                start = None;
            }
            _ => {}
        }
    }
    best
}

/// Arithmetic mean of the longest voiced run.
///
/// # Returns
/// * `Ok(mean)` - Mean pitch of the run in Hz
/// * `Err(NoVoicedSegment)` - Every entry is <= 0 (or NaN)
pub fn average_voiced(pitches: &[f64]) -> TunerResult<f64> {
    let run = longest_voiced_run(pitches).ok_or(TunerError::NoVoicedSegment)?;
    let len = run.len() as f64;
    Ok(pitches[run].iter().sum::<f64>() / len)
}
