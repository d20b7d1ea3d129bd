//! Reference-note playback through the default output device.

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tuner_core::NoteTable;

use crate::wav;

/// Output rate for reference notes
pub const PLAYBACK_SAMPLE_RATE: u32 = 44_100;

/// Open guitar strings and their recordings in the reference-note directory.
pub const GUITAR_STRINGS: [(&str, &str); 6] = [
    ("E2", "Elo0.wav"),
    ("A2", "A0.wav"),
    ("D3", "D0.wav"),
    ("G3", "G0.wav"),
    ("B3", "B0.wav"),
    ("E4", "Ehi0.wav"),
];

/// Path of the reference recording for open string `name` under `dir`.
pub fn string_path(dir: &Path, name: &str) -> Result<PathBuf> {
    GUITAR_STRINGS
        .iter()
        .find(|(string, _)| string.eq_ignore_ascii_case(name))
        .map(|(_, file)| dir.join(file))
        .ok_or_else(|| {
            let names: Vec<&str> = GUITAR_STRINGS.iter().map(|(string, _)| *string).collect();
            anyhow!("{} is not an open string; expected one of {}", name, names.join(", "))
        })
}

/// Plays the reference recording of an open guitar string.
pub fn play_string(dir: &Path, name: &str) -> Result<()> {
    let path = string_path(dir, name)?;
    if let Some(note) = NoteTable::standard().get(&name.to_ascii_uppercase()) {
        log::info!("Reference {} ({:.2} Hz)", note.name, note.frequency);
    }
    play_file(&path)
}

/// Plays a WAV file on the default output device and blocks until it ends.
pub fn play_file(path: &Path) -> Result<()> {
    let (samples, file_rate) = wav::read_mono(path)?;
    if file_rate != PLAYBACK_SAMPLE_RATE {
        log::warn!(
            "{} is {} Hz; playing at {} Hz will shift its pitch",
            path.display(),
            file_rate,
            PLAYBACK_SAMPLE_RATE
        );
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No output device available"))?;
    log::info!("Using audio output device: {}", device.name()?);

    let configs = device.supported_output_configs()?.collect::<Vec<_>>();
    let supported_config = find_output_config(configs, PLAYBACK_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No f32 output format at {} Hz", PLAYBACK_SAMPLE_RATE))?;
    let config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(PLAYBACK_SAMPLE_RATE))
        .into();
    let channels = config.channels.max(1) as usize;

    let duration = Duration::from_secs_f64(samples.len() as f64 / PLAYBACK_SAMPLE_RATE as f64);
    let total = samples.len();
    let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
    let mut position = 0usize;

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                frame.fill(samples.get(position).copied().unwrap_or(0.0));
                position += 1;
            }
            if position >= total {
                let _ = done_tx.try_send(());
            }
        },
        |err: cpal::StreamError| log::error!("An error occurred on the output stream: {}", err),
        None,
    )?;

    stream.play()?;
    log::info!("Playing {} ({:.1} s)", path.display(), duration.as_secs_f64());

    if done_rx.recv_timeout(duration + Duration::from_secs(1)).is_err() {
        log::warn!("Playback did not finish in time; stopping");
    }
    // Let the device drain its last buffer
    std::thread::sleep(Duration::from_millis(100));
    stream.pause()?;
    Ok(())
}

/// Picks an f32 output format whose rate range includes `rate`, fewest channels first.
fn find_output_config(
    configs: Vec<SupportedStreamConfigRange>,
    rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| {
            c.sample_format() == cpal::SampleFormat::F32
                && c.min_sample_rate().0 <= rate
                && rate <= c.max_sample_rate().0
        })
        .min_by_key(|c| c.channels())
}
