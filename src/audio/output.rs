// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio output via cpal.
//!
//! Streams the mixer's rendered output to the default device. The render
//! callback locks the shared mixer for the duration of one buffer; if the
//! lock is unavailable the buffer is left silent rather than blocking the
//! audio thread on a poisoned mutex.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use tracing::{error, info};

use super::mixer::Mixer;
use super::AudioError;

/// Negotiated output stream parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of output channels
    pub channels: u16,
}

/// Live output stream feeding from a shared mixer
pub struct AudioOutput {
    _stream: Stream,
    _device: Device,
    config: OutputConfig,
}

impl AudioOutput {
    /// Open the default output device and start streaming.
    ///
    /// The device's default format wins; the mixer is switched to it
    /// before the stream starts.
    pub fn new(mixer: Arc<Mutex<Mixer>>) -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let default_config = device
            .default_output_config()
            .map_err(|e| AudioError::InitFailed(format!("failed to get default config: {}", e)))?;

        let config = OutputConfig {
            sample_rate: default_config.sample_rate().0,
            channels: default_config.channels(),
        };

        {
            let mut mixer = mixer.lock().map_err(|_| AudioError::LockFailed)?;
            mixer.set_output_format(config.sample_rate, config.channels);
        }

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let render_mixer = Arc::clone(&mixer);
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    match render_mixer.lock() {
                        Ok(mut mixer) => mixer.render(data),
                        Err(_) => data.iter_mut().for_each(|s| *s = 0.0),
                    }
                },
                move |err| {
                    error!("audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamFailed(format!("failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamFailed(format!("failed to start stream: {}", e)))?;

        info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            "audio output started"
        );

        Ok(Self {
            _stream: stream,
            _device: device,
            config,
        })
    }

    /// Negotiated stream parameters
    pub fn config(&self) -> OutputConfig {
        self.config
    }
}

/// Names of the available output devices on the default host
pub fn list_output_devices() -> Result<Vec<String>, AudioError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| AudioError::InitFailed(format!("failed to enumerate devices: {}", e)))?;

    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "<unknown>".to_string()))
        .collect())
}
