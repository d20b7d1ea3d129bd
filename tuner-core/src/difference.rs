//! # Difference Function Module
//!
//! Computes the YIN squared-difference function of one frame for every lag
//! up to `t_max`, using the autocorrelation identity
//!
//! ```text
//! d(t) = sum(x[0..w-t]^2) + sum(x[t..w]^2) - 2 * r(t)
//! ```
//!
//! where `r` is the frame's autocorrelation, obtained from a zero-padded FFT.
//! This replaces the O(w * t_max) double loop with O(n log n) work.

use rustfft::{FftPlanner, num_complex::Complex};

/// Radix factors that keep a transform length cheap for the planner.
const NICE_FACTORS: [usize; 8] = [16, 18, 20, 24, 25, 27, 30, 32];

/// Smallest length of the form `k * 2^p` (k in [`NICE_FACTORS`]) that holds
/// `size` samples, with `p` the bit length of `size / 32`.
pub fn padded_len(size: usize) -> usize {
    let p2 = usize::BITS - (size / 32).leading_zeros();
    let scale = 1usize << p2;
    NICE_FACTORS
        .iter()
        .map(|k| k * scale)
        .find(|&n| n >= size)
        // 32 * 2^p always exceeds size, so the search above never falls through.
        .unwrap_or(32 * scale)
}

/// Reusable state for difference-function computation.
///
/// The FFT planner caches plans per length, and the scratch vectors grow to
/// the largest frame seen, so scanning a block allocates only on the first
/// frame.
pub struct DifferenceEngine {
    planner: FftPlanner<f64>,
    spectrum: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    cumsum: Vec<f64>,
}

impl Default for DifferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DifferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifferenceEngine")
            .field("spectrum_len", &self.spectrum.len())
            .finish()
    }
}

impl DifferenceEngine {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            spectrum: Vec::new(),
            scratch: Vec::new(),
            cumsum: Vec::new(),
        }
    }

    /// Writes `d(0..=t_max)` for `frame` into `out`.
    ///
    /// `t_max` is clamped to the frame length, so `out` ends up with
    /// `min(t_max, frame.len()) + 1` values. `d(0)` is exactly zero and
    /// rounding noise below zero is clamped away.
    ///
    /// # Panics
    /// * If `frame` is empty
    pub fn compute(&mut self, frame: &[f32], t_max: usize, out: &mut Vec<f64>) {
        let w = frame.len();
        assert!(w >= 1, "difference function needs a non-empty frame");
        let t_max = t_max.min(w);

        // --- Cumulative energy: cumsum[i] = sum of x[0..i]^2 ---
        self.cumsum.clear();
        self.cumsum.reserve(w + 1);
        self.cumsum.push(0.0);
        let mut acc = 0.0;
        for &s in frame {
            let s = s as f64;
            acc += s * s;
            self.cumsum.push(acc);
        }

        // --- Autocorrelation via |FFT|^2 ---
        let n = padded_len(w + t_max);
        self.spectrum.clear();
        self.spectrum
            .extend(frame.iter().map(|&s| Complex { re: s as f64, im: 0.0 }));
        self.spectrum.resize(n, Complex { re: 0.0, im: 0.0 });

        let forward = self.planner.plan_fft_forward(n);
        let inverse = self.planner.plan_fft_inverse(n);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        if self.scratch.len() < scratch_len {
            self.scratch.resize(scratch_len, Complex { re: 0.0, im: 0.0 });
        }

        forward.process_with_scratch(&mut self.spectrum, &mut self.scratch[..scratch_len]);
        for bin in self.spectrum.iter_mut() {
            *bin = Complex { re: bin.norm_sqr(), im: 0.0 };
        }
        inverse.process_with_scratch(&mut self.spectrum, &mut self.scratch[..scratch_len]);

        // rustfft leaves the round trip scaled by n.
        let scale = 1.0 / n as f64;
        let total = self.cumsum[w];

        out.clear();
        out.reserve(t_max + 1);
        out.push(0.0);
        for t in 1..=t_max {
            let r = self.spectrum[t].re * scale;
            let d = self.cumsum[w - t] + total - self.cumsum[t] - 2.0 * r;
            out.push(d.max(0.0));
        }
    }
}

/// One-shot difference function of `frame` for lags `0..=min(t_max, len)`.
pub fn difference_function(frame: &[f32], t_max: usize) -> Vec<f64> {
    let mut out = Vec::new();
    DifferenceEngine::new().compute(frame, t_max, &mut out);
    out
}
