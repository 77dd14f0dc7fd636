// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Cell grid and launch state machine.
//!
//! Each cell moves through a four-state launch cycle split into an intent
//! phase and a commit phase: user triggers record intent immediately
//! (`Stopped -> Pending`, `Playing -> Stopping`, and the cancel paths),
//! while the audio-facing transitions (`Pending -> Playing`,
//! `Stopping -> Stopped`) commit only at a quantization boundary. Multiple
//! triggers between boundaries coalesce into the latest intent.

pub mod tracks;

pub use tracks::TrackControls;

use std::sync::Arc;

use crate::sample::SampleHandle;

/// Launch state of a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    /// No playback and no queued intent
    Stopped,
    /// Queued to start at the next boundary
    Pending,
    /// A live voice is playing
    Playing,
    /// Queued to stop at the next boundary
    Stopping,
}

impl Default for CellState {
    fn default() -> Self {
        CellState::Stopped
    }
}

/// Immediate effect a trigger asks the caller to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEffect {
    /// Intent recorded; nothing to do until the next boundary
    Queued,
    /// A queued start was canceled before its boundary; no voice exists
    CanceledStart,
    /// A queued stop was canceled; the live voice must be torn down now
    StopVoiceNow,
    /// The cell holds no sample; the caller should request one
    SampleRequired,
}

/// Commit realized for a cell at a quantization boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryCommit {
    /// Start a voice at the boundary timestamp
    Start,
    /// Destroy the cell's voice
    Stop,
}

/// One cell of the launch grid
#[derive(Debug, Clone)]
pub struct Cell {
    sample: Option<Arc<SampleHandle>>,
    state: CellState,
    volume: f32,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            sample: None,
            state: CellState::Stopped,
            volume: 1.0,
        }
    }
}

impl Cell {
    /// Assigned sample, if any
    pub fn sample(&self) -> Option<&Arc<SampleHandle>> {
        self.sample.as_ref()
    }

    /// Current launch state
    pub fn state(&self) -> CellState {
        self.state
    }

    /// Stored volume in [0, 1]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the stored volume, clamped to [0, 1]
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Replace the cell's sample. The launch state is reset to `Stopped`;
    /// the caller is responsible for tearing down any live voice first.
    pub fn assign_sample(&mut self, sample: Arc<SampleHandle>) {
        self.sample = Some(sample);
        self.state = CellState::Stopped;
    }

    /// Clear the cell back to empty defaults
    pub fn clear(&mut self) {
        self.sample = None;
        self.state = CellState::Stopped;
        self.volume = 1.0;
    }

    /// Apply a user trigger and return the effect to execute.
    ///
    /// Intent transitions happen immediately; an empty cell ignores the
    /// trigger and asks for a sample instead.
    pub fn trigger(&mut self) -> TriggerEffect {
        if self.sample.is_none() {
            return TriggerEffect::SampleRequired;
        }
        match self.state {
            CellState::Stopped => {
                self.state = CellState::Pending;
                TriggerEffect::Queued
            }
            CellState::Pending => {
                self.state = CellState::Stopped;
                TriggerEffect::CanceledStart
            }
            CellState::Playing => {
                self.state = CellState::Stopping;
                TriggerEffect::Queued
            }
            CellState::Stopping => {
                self.state = CellState::Stopped;
                TriggerEffect::StopVoiceNow
            }
        }
    }

    /// Commit the queued intent at a quantization boundary, if any
    pub fn commit_boundary(&mut self) -> Option<BoundaryCommit> {
        match self.state {
            CellState::Pending => {
                self.state = CellState::Playing;
                Some(BoundaryCommit::Start)
            }
            CellState::Stopping => {
                self.state = CellState::Stopped;
                Some(BoundaryCommit::Stop)
            }
            _ => None,
        }
    }

    /// The cell's voice ended on its own (non-looping data exhausted).
    ///
    /// Only takes effect if the cell is still `Playing`; a queued stop or a
    /// relaunch that raced the ending wins.
    pub fn voice_ended(&mut self) -> bool {
        if self.state == CellState::Playing {
            self.state = CellState::Stopped;
            true
        } else {
            false
        }
    }

    /// Force the cell to `Stopped`, discarding any queued intent.
    /// Returns true if the state changed.
    pub fn force_stop(&mut self) -> bool {
        let changed = self.state != CellState::Stopped;
        self.state = CellState::Stopped;
        changed
    }
}

/// Fixed-size grid of launch cells.
///
/// Dimensions are set at construction and never change; resizing requires
/// rebuilding the engine. Cells are mutated only through their
/// state-machine API and are cleared, never removed.
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an empty grid
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::default(); rows * cols],
        }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (also the subdivision cycle length)
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell at (row, col), if in range
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Mutable cell at (row, col), if in range
    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get_mut(row * self.cols + col)
        } else {
            None
        }
    }

    /// Iterate cells in row-major order with their coordinates
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i / cols, i % cols, cell))
    }

    /// Mutable row-major iteration with coordinates
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut Cell)> {
        let cols = self.cols;
        self.cells
            .iter_mut()
            .enumerate()
            .map(move |(i, cell)| (i / cols, i % cols, cell))
    }

    /// Clear every cell back to empty defaults
    pub fn clear_all(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }
}
