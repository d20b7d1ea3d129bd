//! # Audio Capture Module
//!
//! Real-time capture from the default input device using CPAL. The device
//! callback cuts the incoming stream into fixed-length mono blocks and hands
//! each finished block to the analysis side through a [`BlockPublisher`].

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tuner_core::{BlockAssembler, BlockPublisher};

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `publisher` - Receives every completed block; stale blocks are replaced
/// * `target_rate` - Preferred sample rate, clamped to what the device offers
/// * `block_seconds` - Length of each analysis block
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Running stream handle and its actual sample rate
/// * `Err(e)` - No usable device or format
pub fn start_audio_capture(
    mut publisher: BlockPublisher,
    target_rate: u32,
    block_seconds: f64,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, target_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = target_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let sample_rate = config.sample_rate().0;
    let channels = config.channels();
    let config: cpal::StreamConfig = config.into();

    if sample_rate != target_rate {
        log::warn!("Device does not offer {} Hz; capturing at {} Hz", target_rate, sample_rate);
    }
    log::info!("Selected sample rate: {} Hz, {} channel(s)", sample_rate, channels);

    let block_len = (block_seconds * sample_rate as f64).round() as usize;
    let mut assembler = BlockAssembler::new(block_len, sample_rate, channels);
    log::debug!("Capture blocks of {} samples", assembler.block_len());

    let err_fn =
        |err: cpal::StreamError| log::error!("An error occurred on the audio stream: {}", err);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            assembler.push(data, |block| {
                publisher.publish(block);
            });
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks the f32 input format closest to `target_rate`, preferring mono.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let (min, max) = (c.min_sample_rate().0, c.max_sample_rate().0);
            let distance = if target_rate < min {
                min - target_rate
            } else {
                target_rate.saturating_sub(max)
            };
            (distance, c.channels() != 1, c.channels())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::{SampleFormat, SampleRate, SupportedBufferSize, SupportedStreamConfigRange};

    fn range(
        channels: u16,
        min: u32,
        max: u32,
        format: SampleFormat,
    ) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn test_prefers_mono_covering_target() {
        let configs = vec![
            range(2, 8_000, 96_000, SampleFormat::F32),
            range(1, 8_000, 96_000, SampleFormat::F32),
            range(1, 8_000, 96_000, SampleFormat::I16),
        ];
        let chosen = find_supported_config(configs, 44_100).unwrap();
        assert_eq!(chosen.channels(), 1);
        assert_eq!(chosen.sample_format(), SampleFormat::F32);
    }

    #[test]
    fn test_rate_coverage_beats_channel_count() {
        let configs = vec![
            range(1, 48_000, 48_000, SampleFormat::F32),
            range(2, 44_100, 44_100, SampleFormat::F32),
        ];
        let chosen = find_supported_config(configs, 44_100).unwrap();
        assert_eq!(chosen.channels(), 2);
    }

    #[test]
    fn test_no_float_format() {
        let configs = vec![range(1, 44_100, 44_100, SampleFormat::I16)];
        assert!(find_supported_config(configs, 44_100).is_none());
    }
}
