// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio subsystem for the clip grid.
//!
//! This module provides:
//! - Voice mixing with smoothed gain automation and the audio clock
//! - Audio output via cpal (render callback behind a shared mixer)

pub mod mixer;
pub mod output;

pub use mixer::{Mixer, VoiceId, GAIN_SMOOTHING_SECONDS};
pub use output::{list_output_devices, AudioOutput, OutputConfig};

use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Audio error types
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    /// Failed to initialize audio
    #[error("audio initialization failed: {0}")]
    InitFailed(String),
    /// Failed to start the audio stream
    #[error("audio stream failed: {0}")]
    StreamFailed(String),
    /// Failed to acquire the mixer lock
    #[error("failed to acquire audio lock")]
    LockFailed,
    /// No audio device available
    #[error("no audio device available")]
    NoDevice,
}

/// Audio system combining the shared mixer and an optional output stream.
///
/// Without a stream the mixer still works headless: the engine can be
/// ticked with explicit timestamps and buffers rendered by hand, which is
/// how the test suite drives it.
pub struct AudioSystem {
    mixer: Arc<Mutex<Mixer>>,
    output: Option<AudioOutput>,
}

impl AudioSystem {
    /// Create a headless audio system with a default-format mixer
    pub fn new() -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::new(44_100, 2))),
            output: None,
        }
    }

    /// Shared mixer handle
    pub fn mixer(&self) -> Arc<Mutex<Mixer>> {
        Arc::clone(&self.mixer)
    }

    /// Start streaming to the default output device. Idempotent.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.output.is_some() {
            return Ok(());
        }
        self.output = Some(AudioOutput::new(Arc::clone(&self.mixer))?);
        Ok(())
    }

    /// Stop the output stream, keeping the mixer and its clock
    pub fn stop(&mut self) {
        self.output = None;
    }

    /// Whether an output stream is running
    pub fn is_running(&self) -> bool {
        self.output.is_some()
    }

    /// Current audio-clock reading, in seconds
    pub fn clock_seconds(&self) -> Result<f64, AudioError> {
        let mixer = self.mixer.lock().map_err(|_| AudioError::LockFailed)?;
        Ok(mixer.clock_seconds())
    }
}

impl Default for AudioSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_system() {
        let system = AudioSystem::new();
        assert!(!system.is_running());
        assert_eq!(system.clock_seconds().unwrap(), 0.0);
    }

    #[test]
    fn test_mixer_handle_is_shared() {
        let system = AudioSystem::new();
        let a = system.mixer();
        let b = system.mixer();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
