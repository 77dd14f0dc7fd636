// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Preset persistence.
//!
//! A preset captures only durable state: per-cell sample paths and
//! volumes, the tempo, and the track mute/solo flags. Runtime state (live
//! voices, subdivision phase, recording status) is never serialized and is
//! always reset on restore. Presets are stored as JSON files in a named
//! store directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the preset store and restore path
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset {0:?} not found")]
    NotFound(String),
    #[error("invalid preset name {0:?}")]
    InvalidName(String),
    #[error("malformed preset: {0}")]
    Malformed(String),
    #[error("preset grid is {got_rows}x{got_cols} but the engine grid is {rows}x{cols}")]
    DimensionMismatch {
        got_rows: usize,
        got_cols: usize,
        rows: usize,
        cols: usize,
    },
    #[error("preset store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persisted state of one cell
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellPreset {
    /// Sample path relative to the sample root (None = empty cell)
    #[serde(default)]
    pub sample_path: Option<PathBuf>,
    /// Stored volume in [0, 1]
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_volume() -> f32 {
    1.0
}

impl Default for CellPreset {
    fn default() -> Self {
        Self {
            sample_path: None,
            volume: default_volume(),
        }
    }
}

/// A complete persisted grid state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    /// Tempo in BPM
    #[serde(default = "default_tempo")]
    pub tempo: f64,
    /// Cells in row-major nested rows
    pub cells: Vec<Vec<CellPreset>>,
    /// Per-column mute flags; missing entries default to false
    #[serde(default)]
    pub track_mutes: Vec<bool>,
    /// Per-column solo flags; missing entries default to false
    #[serde(default)]
    pub track_solos: Vec<bool>,
}

fn default_tempo() -> f64 {
    120.0
}

impl Preset {
    /// Build an empty preset for a rows x cols grid
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            tempo: default_tempo(),
            cells: vec![vec![CellPreset::default(); cols]; rows],
            track_mutes: vec![false; cols],
            track_solos: vec![false; cols],
        }
    }

    /// Verify the preset fits a rows x cols grid and carries a usable tempo
    pub fn validate_for(&self, rows: usize, cols: usize) -> Result<(), PresetError> {
        let got_rows = self.cells.len();
        let got_cols = self.cells.first().map(|r| r.len()).unwrap_or(0);
        if got_rows != rows || self.cells.iter().any(|r| r.len() != cols) {
            return Err(PresetError::DimensionMismatch {
                got_rows,
                got_cols,
                rows,
                cols,
            });
        }
        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return Err(PresetError::Malformed(format!(
                "tempo must be positive (got {})",
                self.tempo
            )));
        }
        Ok(())
    }
}

/// Directory-backed store of named presets
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PresetError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, PresetError> {
        if name.is_empty()
            || name.contains(['/', '\\'])
            || name.starts_with('.')
            || name.len() > 128
        {
            return Err(PresetError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }

    /// Save a preset under `name`, replacing any existing one
    pub fn save(&self, name: &str, preset: &Preset) -> Result<(), PresetError> {
        let path = self.path_for(name)?;
        let json = serde_json::to_string_pretty(preset)
            .map_err(|e| PresetError::Malformed(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load the preset stored under `name`
    pub fn load(&self, name: &str) -> Result<Preset, PresetError> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(PresetError::NotFound(name.to_string()));
        }
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| PresetError::Malformed(e.to_string()))
    }

    /// Delete the preset stored under `name`
    pub fn delete(&self, name: &str) -> Result<(), PresetError> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(PresetError::NotFound(name.to_string()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Sorted names of every stored preset
    pub fn list(&self) -> Result<Vec<String>, PresetError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
