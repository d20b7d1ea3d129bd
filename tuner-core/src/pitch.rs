//! # Pitch Detection Module
//!
//! The normalization and period-search steps of the YIN algorithm
//! (de Cheveigné and Kawahara, 2002). The difference function itself lives in
//! [`crate::difference`]; frame slicing lives in [`crate::scanner`].

/// Default CMNDF threshold for accepting a lag as the period.
pub const DEFAULT_HARMONIC_THRESHOLD: f64 = 0.1;

/// Cumulative mean normalized difference function of `df`.
///
/// `CMNDF[0]` is 1 by convention; for `t >= 1` each value is divided by the
/// running mean of `df[1..=t]`, which makes the threshold test independent of
/// frame energy.
///
/// # Panics
/// * If `df` is empty
pub fn cumulative_mean_normalized(df: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(df.len());
    cumulative_mean_normalized_into(df, &mut out);
    out
}

/// Same as [`cumulative_mean_normalized`], writing into a reusable buffer.
pub fn cumulative_mean_normalized_into(df: &[f64], out: &mut Vec<f64>) {
    assert!(!df.is_empty(), "CMNDF needs at least one lag");
    out.clear();
    out.reserve(df.len());
    out.push(1.0);

    let mut running_sum = 0.0;
    for (tau, &d) in df.iter().enumerate().skip(1) {
        running_sum += d;
        // A zero running sum yields NaN, which never passes the threshold.
        out.push(d * tau as f64 / running_sum);
    }
}

/// Finds the period lag in `cmndf`, or 0 when the frame is unvoiced.
///
/// Lags `t_min..t_max` are scanned in order. The first one strictly below
/// `threshold` starts a descent that follows decreasing values to the local
/// minimum, so a shallow bump just under the threshold does not win over the
/// true dip next to it.
pub fn find_period(cmndf: &[f64], t_min: usize, t_max: usize, threshold: f64) -> usize {
    let t_max = t_max.min(cmndf.len());
    let mut tau = t_min;
    while tau < t_max {
        if cmndf[tau] < threshold {
            while tau + 1 < t_max && cmndf[tau + 1] < cmndf[tau] {
                tau += 1;
            }
            return tau;
        }
        tau += 1;
    }
    0
}

/// Difference at `lag` per overlapping sample, relative to twice the frame's
/// mean power.
///
/// Near 0 when the two overlapping stretches match, near 1 for uncorrelated
/// noise. Unlike the CMNDF it does not shrink towards 0 as the overlap
/// `frame_len - lag` runs out.
pub fn aperiodicity(d: f64, lag: usize, frame_len: usize, energy: f64) -> f64 {
    let overlap = frame_len.saturating_sub(lag);
    if overlap == 0 || energy <= 0.0 {
        return f64::INFINITY;
    }
    let mean_power = energy / frame_len as f64;
    d / (overlap as f64 * 2.0 * mean_power)
}

/// Smallest finite CMNDF value and its lag, ignoring NaN entries.
pub fn cmndf_minimum(cmndf: &[f64]) -> Option<(usize, f64)> {
    cmndf
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best, (tau, v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((tau, v)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difference::difference_function;

    fn generate_sine(freq: f32, sample_rate: u32, num_samples: usize) -> Vec<f32> {
        (0..num_samples)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_cmndf_starts_at_one_and_is_non_negative() {
        for freq in [82.41, 146.83, 440.0] {
            let frame = generate_sine(freq, 44_100, 882);
            let cmndf = cumulative_mean_normalized(&difference_function(&frame, 882));
            assert_eq!(cmndf[0], 1.0);
            assert!(cmndf[1..].iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn test_aperiodicity_separates_period_from_noise() {
        // A matching lag has no difference at all
        assert_eq!(aperiodicity(0.0, 200, 882, 100.0), 0.0);
        // Uncorrelated samples: E[(a - b)^2] = 2 * power per overlapping sample
        let power = 0.25;
        let energy = power * 882.0;
        let d = 2.0 * power * 48.0;
        approx::assert_relative_eq!(aperiodicity(d, 834, 882, energy), 1.0);
        assert!(aperiodicity(1.0, 882, 882, energy).is_infinite());
        assert!(aperiodicity(1.0, 100, 882, 0.0).is_infinite());
    }

    #[test]
    fn test_cmndf_matches_definition() {
        let df = [0.0, 2.0, 4.0, 1.0];
        let cmndf = cumulative_mean_normalized(&df);
        assert_eq!(cmndf, vec![1.0, 1.0, 4.0 * 2.0 / 6.0, 1.0 * 3.0 / 7.0]);
    }

    #[test]
    fn test_cmndf_is_scale_invariant() {
        let df = [0.0, 3.0, 5.0, 0.5, 4.0];
        let scaled: Vec<f64> = df.iter().map(|d| d * 1000.0).collect();
        let a = cumulative_mean_normalized(&df);
        let b = cumulative_mean_normalized(&scaled);
        for (x, y) in a.iter().zip(b.iter()) {
            approx::assert_relative_eq!(*x, *y, max_relative = 1e-12);
        }
    }

    #[test]
    #[should_panic]
    fn test_empty_df_is_a_precondition_violation() {
        cumulative_mean_normalized(&[]);
    }

    #[test]
    fn test_find_period_walks_to_local_minimum() {
        let cmndf = [1.0, 0.9, 0.8, 0.09, 0.05, 0.02, 0.04, 0.3, 0.01];
        assert_eq!(find_period(&cmndf, 1, cmndf.len(), 0.1), 5);
    }

    #[test]
    fn test_find_period_respects_bounds() {
        let cmndf = [1.0, 0.05, 0.5, 0.5, 0.04, 0.03];
        // Lag 1 is below t_min; the descent stops before t_max.
        assert_eq!(find_period(&cmndf, 2, 5, 0.1), 4);
        // Nothing under threshold inside the window.
        assert_eq!(find_period(&cmndf, 2, 4, 0.1), 0);
    }

    #[test]
    fn test_find_period_clamps_t_max_to_length() {
        let cmndf = [1.0, 0.5, 0.5];
        assert_eq!(find_period(&cmndf, 0, 100, 0.1), 0);
    }

    #[test]
    fn test_find_period_recovers_sine_period() {
        let frame = generate_sine(441.0, 44_100, 882);
        let cmndf = cumulative_mean_normalized(&difference_function(&frame, 882));
        assert_eq!(find_period(&cmndf, 88, 882, DEFAULT_HARMONIC_THRESHOLD), 100);
    }

    #[test]
    fn test_nan_never_selected() {
        let cmndf = cumulative_mean_normalized(&[0.0, 0.0, 0.0, 0.0]);
        assert!(cmndf[1..].iter().all(|v| v.is_nan()));
        assert_eq!(find_period(&cmndf, 1, 4, 0.1), 0);
        assert_eq!(cmndf_minimum(&cmndf), Some((0, 1.0)));
    }

    #[test]
    fn test_minimum_prefers_first_lag_on_ties() {
        assert_eq!(cmndf_minimum(&[1.0, 0.2, 0.2, 0.5]), Some((1, 0.2)));
        assert_eq!(cmndf_minimum(&[]), None);
    }
}
