// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for the clip grid engine.
//!
//! This module provides the engine configuration data structure with YAML
//! load/save, per-field defaults, and validation at the boundary so a bad
//! file can never half-configure a running engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timing::ClockConfig;

/// Rejected configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid dimensions must be between 1 and 64 (got {rows}x{cols})")]
    BadDimensions { rows: usize, cols: usize },
    #[error("tempo must be a positive, finite BPM value (got {0})")]
    BadTempo(f64),
    #[error("lookahead interval must be at least 1 ms (got {0})")]
    BadLookahead(u64),
    #[error("schedule-ahead window must be positive (got {0})")]
    BadScheduleAhead(f64),
    #[error("gain smoothing must not be negative (got {0})")]
    BadSmoothing(f64),
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Grid rows
    #[serde(default = "default_rows")]
    pub rows: usize,
    /// Grid columns (also the subdivision cycle length)
    #[serde(default = "default_cols")]
    pub cols: usize,
    /// Initial tempo in BPM
    #[serde(default = "default_tempo")]
    pub tempo: f64,
    /// Control-rate poll period in milliseconds
    #[serde(default = "default_lookahead_ms")]
    pub lookahead_ms: u64,
    /// How far ahead of the audio clock events are pre-scheduled, seconds
    #[serde(default = "default_schedule_ahead")]
    pub schedule_ahead_seconds: f64,
    /// Gap between starting and the first scheduled subdivision, seconds
    #[serde(default = "default_start_delay")]
    pub start_delay_seconds: f64,
    /// Gain smoothing time constant for mute/solo ramps, seconds
    #[serde(default = "default_gain_smoothing")]
    pub gain_smoothing_seconds: f64,
    /// Root directory of the sample library
    #[serde(default)]
    pub sample_root: Option<PathBuf>,
}

fn default_rows() -> usize {
    8
}
fn default_cols() -> usize {
    8
}
fn default_tempo() -> f64 {
    120.0
}
fn default_lookahead_ms() -> u64 {
    25
}
fn default_schedule_ahead() -> f64 {
    0.1
}
fn default_start_delay() -> f64 {
    0.1
}
fn default_gain_smoothing() -> f64 {
    0.01
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
            tempo: default_tempo(),
            lookahead_ms: default_lookahead_ms(),
            schedule_ahead_seconds: default_schedule_ahead(),
            start_delay_seconds: default_start_delay(),
            gain_smoothing_seconds: default_gain_smoothing(),
            sample_root: None,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Save the configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        std::fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Check every value; a failed check rejects the whole configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 || self.rows > 64 || self.cols > 64 {
            return Err(ConfigError::BadDimensions {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return Err(ConfigError::BadTempo(self.tempo));
        }
        if self.lookahead_ms == 0 {
            return Err(ConfigError::BadLookahead(self.lookahead_ms));
        }
        if !self.schedule_ahead_seconds.is_finite() || self.schedule_ahead_seconds <= 0.0 {
            return Err(ConfigError::BadScheduleAhead(self.schedule_ahead_seconds));
        }
        if !self.gain_smoothing_seconds.is_finite() || self.gain_smoothing_seconds < 0.0 {
            return Err(ConfigError::BadSmoothing(self.gain_smoothing_seconds));
        }
        Ok(())
    }

    /// Clock parameters derived from this configuration
    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            lookahead_interval: Duration::from_millis(self.lookahead_ms),
            schedule_ahead: self.schedule_ahead_seconds,
            start_delay: self.start_delay_seconds,
        }
    }
}
