//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! It selects an input device, negotiates a 32-bit float stream format, and runs the
//! analysis pipeline inside the stream's data callback.
//!
//! ## Features
//! - Default or named input device selection
//! - Float format negotiation, preferring the device's default config
//! - Pipeline driven synchronously from the capture callback
//! - Stream errors forwarded to the display thread

use anyhow::{Context, Result, anyhow};
use bandviz_core::{AudioFormat, FrameAnalysis, Pipeline, SampleFormat, StreamFormat};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SupportedStreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::Sender;

/// Sample rate requested when the device's default config is not float.
pub const PREFERRED_SAMPLE_RATE: u32 = 44100;

/// Finds the input device to capture from.
///
/// # Arguments
/// * `host` - The audio host to search
/// * `name` - Device name to match exactly, or `None` for the default input
pub fn select_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device> {
    let Some(name) = name else {
        return host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"));
    };

    for device in host.input_devices()? {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(anyhow!("No input device named {:?}", name))
}

/// Picks the stream config to open.
///
/// The device's default input config wins when it already delivers f32
/// samples. Otherwise the f32 config closest to [`PREFERRED_SAMPLE_RATE`] is
/// used. When the device has no f32 config at all the default is returned
/// unchanged, so the pipeline gets to reject its format.
pub fn negotiate_config(device: &cpal::Device) -> Result<SupportedStreamConfig> {
    let default_config = device
        .default_input_config()
        .context("Failed to query default input config")?;
    if default_config.sample_format() == cpal::SampleFormat::F32 {
        return Ok(default_config);
    }

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    match find_float_config(configs, PREFERRED_SAMPLE_RATE) {
        Some(range) => {
            let rate = PREFERRED_SAMPLE_RATE.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
            Ok(range.with_sample_rate(cpal::SampleRate(rate)))
        }
        None => Ok(default_config),
    }
}

/// Finds the f32 configuration whose rate range lies closest to `target_rate`.
fn find_float_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            if (min..=max).contains(&target_rate) {
                0
            } else {
                min.abs_diff(target_rate).min(max.abs_diff(target_rate))
            }
        })
}

/// Describes a negotiated cpal config in the pipeline's terms.
pub fn stream_format(config: &SupportedStreamConfig) -> StreamFormat {
    let sample_format = match config.sample_format() {
        cpal::SampleFormat::F32 => SampleFormat::F32,
        other => SampleFormat::Other(format!("{:?}", other)),
    };
    StreamFormat {
        sample_rate: config.sample_rate().0,
        channel_count: config.channels(),
        sample_format,
    }
}

/// Opens the capture stream and moves `pipeline` into its data callback.
///
/// Every frame the pipeline completes is handed to `on_frame` on the capture
/// thread, so `on_frame` must not block. Stream errors are logged and sent on
/// `errors`.
///
/// # Returns
/// * `Ok((stream, format))` - The running stream and the accepted format
/// * `Err(e)` - No device, no usable format, or the stream failed to start
pub fn start_capture<F>(
    device_name: Option<&str>,
    mut pipeline: Pipeline,
    mut on_frame: F,
    errors: Sender<String>,
) -> Result<(cpal::Stream, AudioFormat)>
where
    F: FnMut(&FrameAnalysis<'_>) + Send + 'static,
{
    let host = cpal::default_host();
    let device = select_device(&host, device_name)?;
    log::info!("Using audio input device: {}", device.name()?);

    let supported_config = negotiate_config(&device)?;
    let format = pipeline
        .on_format_negotiated(stream_format(&supported_config))
        .context("Audio format rejected")?
        .ok_or_else(|| anyhow!("Input device reports a sample rate of 0"))?;
    let config: cpal::StreamConfig = supported_config.into();

    let err_fn = move |err: cpal::StreamError| {
        log::error!("An error occurred on the audio stream: {}", err);
        let _ = errors.try_send(err.to_string());
    };

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let block = if data.is_empty() { None } else { Some(data) };
            pipeline.on_samples_available(block, &mut on_frame);
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, format))
}
