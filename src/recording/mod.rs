// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Mixed-output recording.
//!
//! The mixer exposes a capture tap on its rendered output; the recorder
//! arms and disarms that tap and exports the captured frames as WAV. The
//! engine itself only ever signals start and stop.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::info;

use crate::audio::{AudioError, Mixer};

/// Recorder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// Tap disarmed
    Idle,
    /// Tap armed, frames accumulating
    Recording,
}

/// Captured mixed output
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAudio {
    /// Interleaved f32 frames
    pub frames: Vec<f32>,
    /// Channel count at capture time
    pub channels: u16,
    /// Sample rate at capture time
    pub sample_rate: u32,
}

impl RecordedAudio {
    /// Length of the recording in seconds
    pub fn duration_seconds(&self) -> f64 {
        let channels = self.channels.max(1) as usize;
        (self.frames.len() / channels) as f64 / self.sample_rate.max(1) as f64
    }

    /// Write the recording as a 32-bit float WAV file
    pub fn save_wav<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path.as_ref(), spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path.as_ref()))?;
        for sample in &self.frames {
            writer.write_sample(*sample)?;
        }
        writer.finalize().context("Failed to finalize WAV file")?;
        info!(path = ?path.as_ref(), "recording saved");
        Ok(())
    }
}

/// Arms the mixer's capture tap and collects the result
pub struct Recorder {
    mixer: Arc<Mutex<Mixer>>,
    state: RecordingState,
}

impl Recorder {
    /// Create a recorder over the shared mixer
    pub fn new(mixer: Arc<Mutex<Mixer>>) -> Self {
        Self {
            mixer,
            state: RecordingState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Arm the capture tap. Idempotent.
    pub fn start(&mut self) -> Result<(), AudioError> {
        let mut mixer = self.mixer.lock().map_err(|_| AudioError::LockFailed)?;
        mixer.start_capture();
        self.state = RecordingState::Recording;
        info!("recording started");
        Ok(())
    }

    /// Disarm the tap and hand back everything captured since `start`
    pub fn stop(&mut self) -> Result<RecordedAudio, AudioError> {
        let mut mixer = self.mixer.lock().map_err(|_| AudioError::LockFailed)?;
        let frames = mixer.finish_capture().unwrap_or_default();
        let recorded = RecordedAudio {
            frames,
            channels: mixer.channels(),
            sample_rate: mixer.sample_rate(),
        };
        self.state = RecordingState::Idle;
        info!(
            seconds = recorded.duration_seconds(),
            "recording stopped"
        );
        Ok(recorded)
    }
}
