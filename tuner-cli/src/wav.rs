//! WAV file reading for offline analysis and reference-note playback.

use anyhow::{Context, Result};
use std::path::Path;

/// Reads a WAV file as mono f32 samples in [-1, 1].
///
/// Multi-channel files are averaged to mono.
///
/// # Returns
/// * `Ok((samples, sample_rate))` - Decoded samples and the file's sample rate
pub fn read_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("Failed to decode {}", path.display()))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("Failed to decode {}", path.display()))?
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    log::debug!(
        "Read {}: {} Hz, {} channel(s), {} samples",
        path.display(),
        spec.sample_rate,
        spec.channels,
        samples.len()
    );
    Ok((samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(name: &str, spec: hound::WavSpec, samples: &[i16]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("tuner-{}-{}", std::process::id(), name));
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_reads_16_bit_mono() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = write_wav("mono.wav", spec, &[0, 16_384, -32_768]);
        let (samples, rate) = read_mono(&path).unwrap();
        assert_eq!(rate, 44_100);
        assert_eq!(samples, vec![0.0, 0.5, -1.0]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_downmixes_stereo() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = write_wav("stereo.wav", spec, &[16_384, 0, -16_384, -16_384]);
        let (samples, rate) = read_mono(&path).unwrap();
        assert_eq!(rate, 48_000);
        assert_eq!(samples, vec![0.25, -0.5]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = read_mono(Path::new("/nonexistent/E2.wav")).unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }
}
