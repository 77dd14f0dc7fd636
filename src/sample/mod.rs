// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sample loading and handles.
//!
//! A `SampleHandle` is an immutable decoded sample shared between the cell
//! that owns it and any in-flight voice still playing it. Handles carry the
//! load-time rate normalization so live voices can be retuned when the
//! tempo changes without re-matching the sample.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::playback::rate;

/// Errors raised while loading a sample
#[derive(Debug, Error)]
pub enum SampleLoadError {
    /// The file could not be opened or decoded
    #[error("failed to read sample {path:?}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    /// The file decoded but its format is not supported
    #[error("unsupported sample format in {path:?}: {detail}")]
    Unsupported { path: PathBuf, detail: String },
    /// The file decoded to zero frames
    #[error("sample {path:?} contains no audio data")]
    Empty { path: PathBuf },
}

/// Immutable decoded audio plus its rate normalization.
///
/// `data` holds interleaved f32 frames. The handle is reference-counted;
/// its lifetime is the longest-lived cell or voice that still refers to it.
#[derive(Debug, Clone)]
pub struct SampleHandle {
    name: String,
    path: PathBuf,
    data: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
    natural_duration_seconds: f64,
    reference_playback_rate: f64,
}

impl SampleHandle {
    /// Build a handle from decoded frames.
    ///
    /// Computes the natural duration and the load-time playback rate
    /// against the fixed reference tempo.
    pub fn from_frames(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        data: Vec<f32>,
        channels: u16,
        sample_rate: u32,
    ) -> Self {
        let frames = data.len() / channels.max(1) as usize;
        let natural_duration_seconds = frames as f64 / sample_rate.max(1) as f64;
        Self {
            name: name.into(),
            path: path.into(),
            data: data.into(),
            channels,
            sample_rate,
            natural_duration_seconds,
            reference_playback_rate: rate::reference_rate(natural_duration_seconds),
        }
    }

    /// Sample display name (file name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path the sample was loaded from (persisted in presets)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Interleaved f32 frames
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of interleaved channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Source sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels.max(1) as usize
    }

    /// Duration of the raw data at its source rate, in seconds
    pub fn natural_duration_seconds(&self) -> f64 {
        self.natural_duration_seconds
    }

    /// Load-time playback rate against the 120 BPM reference grid
    pub fn reference_playback_rate(&self) -> f64 {
        self.reference_playback_rate
    }
}

/// Source of decoded samples for the engine.
///
/// Load failures are recovered locally: the requesting cell stays empty and
/// the error is surfaced to the caller for display.
pub trait SampleProvider {
    /// Decode the sample at `path` (relative paths resolve against the
    /// provider's root).
    fn load(&self, path: &Path) -> Result<Arc<SampleHandle>, SampleLoadError>;
}

/// WAV-file sample provider backed by hound.
pub struct WavSampleProvider {
    root: PathBuf,
}

impl WavSampleProvider {
    /// Create a provider resolving relative paths against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl SampleProvider for WavSampleProvider {
    fn load(&self, path: &Path) -> Result<Arc<SampleHandle>, SampleLoadError> {
        let full = self.resolve(path);
        let mut reader = hound::WavReader::open(&full).map_err(|e| SampleLoadError::Unreadable {
            path: full.clone(),
            reason: e.to_string(),
        })?;

        let spec = reader.spec();
        let data: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| SampleLoadError::Unreadable {
                    path: full.clone(),
                    reason: e.to_string(),
                })?,
            (hound::SampleFormat::Int, bits) if bits <= 32 => {
                let scale = (1i64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| SampleLoadError::Unreadable {
                        path: full.clone(),
                        reason: e.to_string(),
                    })?
            }
            (format, bits) => {
                return Err(SampleLoadError::Unsupported {
                    path: full,
                    detail: format!("{:?} at {} bits per sample", format, bits),
                })
            }
        };

        if data.is_empty() {
            return Err(SampleLoadError::Empty { path: full });
        }

        let name = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| full.to_string_lossy().into_owned());

        Ok(Arc::new(SampleHandle::from_frames(
            name,
            path,
            data,
            spec.channels,
            spec.sample_rate,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, frames: usize, channels: u16, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * channels as usize {
            writer.write_sample((i % 128) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_handle_from_frames() {
        // 88200 mono frames at 44.1 kHz = 2.0 seconds = one reference bar
        let handle = SampleHandle::from_frames("a.wav", "a.wav", vec![0.0; 88_200], 1, 44_100);

        assert_eq!(handle.frames(), 88_200);
        assert_eq!(handle.natural_duration_seconds(), 2.0);
        assert_eq!(handle.reference_playback_rate(), 1.0);
    }

    #[test]
    fn test_handle_stereo_frame_count() {
        let handle = SampleHandle::from_frames("s.wav", "s.wav", vec![0.0; 2000], 2, 1000);
        assert_eq!(handle.frames(), 1000);
        assert_eq!(handle.natural_duration_seconds(), 1.0);
    }

    #[test]
    fn test_wav_provider_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.wav");
        write_test_wav(&path, 44_100, 2, 44_100);

        let provider = WavSampleProvider::new(dir.path());
        let handle = provider.load(Path::new("loop.wav")).unwrap();

        assert_eq!(handle.name(), "loop.wav");
        assert_eq!(handle.channels(), 2);
        assert_eq!(handle.frames(), 44_100);
        assert!((handle.natural_duration_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_wav_provider_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = WavSampleProvider::new(dir.path());

        let err = provider.load(Path::new("nope.wav")).unwrap_err();
        assert!(matches!(err, SampleLoadError::Unreadable { .. }));
    }

    #[test]
    fn test_wav_provider_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abs.wav");
        write_test_wav(&path, 128, 1, 44_100);

        let provider = WavSampleProvider::new("/somewhere/else");
        let handle = provider.load(&path).unwrap();
        assert_eq!(handle.frames(), 128);
    }
}
