// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Engine facade.
//!
//! The engine is the single-writer owner of all sequencing state: the
//! grid, the transport, the lookahead clock, the track controls, and the
//! voice manager. Every mutation happens on the thread that owns the
//! engine; external producers go through the command queue in
//! [`runner`]. UI decoupling is an explicit callback contract
//! (`on_cell_state_changed`, `on_transport_advanced`,
//! `on_sample_requested`), not an implicit broadcast.

pub mod runner;

pub use runner::{ControlClock, EngineCommand, EngineController};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audio::{AudioError, Mixer};
use crate::config::EngineConfig;
use crate::grid::{BoundaryCommit, CellState, Grid, TrackControls, TriggerEffect};
use crate::playback::VoiceManager;
use crate::preset::{CellPreset, Preset, PresetError};
use crate::sample::{SampleHandle, SampleProvider};
use crate::timing::{LookaheadClock, Transport};

/// Errors rejected at the facade boundary
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("tempo must be a positive, finite BPM value (got {0})")]
    InvalidTempo(f64),
    #[error("cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    CellOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("column {col} is outside the {cols}-column grid")]
    ColumnOutOfRange { col: usize, cols: usize },
    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Cell launch-state change notification
pub type CellStateCallback = Box<dyn FnMut(usize, usize, CellState) + Send>;
/// Transport advance notification (new subdivision index)
pub type TransportCallback = Box<dyn FnMut(usize) + Send>;
/// Request to pick a sample for an empty, triggered cell
pub type SampleRequestCallback = Box<dyn FnMut(usize, usize) + Send>;

#[derive(Default)]
struct Callbacks {
    cell_state: Option<CellStateCallback>,
    transport: Option<TransportCallback>,
    sample_request: Option<SampleRequestCallback>,
}

impl Callbacks {
    fn cell_state_changed(&mut self, row: usize, col: usize, state: CellState) {
        if let Some(cb) = &mut self.cell_state {
            cb(row, col, state);
        }
    }

    fn transport_advanced(&mut self, subdivision: usize) {
        if let Some(cb) = &mut self.transport {
            cb(subdivision);
        }
    }

    fn sample_requested(&mut self, row: usize, col: usize) {
        if let Some(cb) = &mut self.sample_request {
            cb(row, col);
        }
    }
}

/// The clip-launch engine.
pub struct Engine {
    grid: Grid,
    transport: Transport,
    clock: LookaheadClock,
    controls: TrackControls,
    voices: VoiceManager,
    callbacks: Callbacks,
}

impl Engine {
    /// Build an engine from a validated configuration and a shared mixer
    pub fn new(config: &EngineConfig, mixer: Arc<Mutex<Mixer>>) -> Self {
        if let Ok(mut mixer) = mixer.lock() {
            mixer.set_gain_smoothing(config.gain_smoothing_seconds);
        }
        Self {
            grid: Grid::new(config.rows, config.cols),
            transport: Transport::new(config.tempo),
            clock: LookaheadClock::new(config.clock_config()),
            controls: TrackControls::new(config.cols),
            voices: VoiceManager::new(mixer, config.rows, config.cols),
            callbacks: Callbacks::default(),
        }
    }

    /// Grid accessor
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Track mute/solo flags
    pub fn controls(&self) -> &TrackControls {
        &self.controls
    }

    /// Transport accessor
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Current tempo in BPM
    pub fn tempo(&self) -> f64 {
        self.transport.tempo_bpm
    }

    /// Whether the scheduler is polling
    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Control-rate poll period for the thread driving `tick`
    pub fn poll_interval(&self) -> std::time::Duration {
        self.clock.poll_interval()
    }

    /// Live voice count
    pub fn live_voices(&self) -> usize {
        self.voices.live_count()
    }

    /// Register the cell state-change callback
    pub fn on_cell_state_changed(&mut self, cb: CellStateCallback) {
        self.callbacks.cell_state = Some(cb);
    }

    /// Register the transport-advance callback
    pub fn on_transport_advanced(&mut self, cb: TransportCallback) {
        self.callbacks.transport = Some(cb);
    }

    /// Register the sample-request callback
    pub fn on_sample_requested(&mut self, cb: SampleRequestCallback) {
        self.callbacks.sample_request = Some(cb);
    }

    fn check_cell(&self, row: usize, col: usize) -> Result<(), EngineError> {
        if row >= self.grid.rows() || col >= self.grid.cols() {
            return Err(EngineError::CellOutOfRange {
                row,
                col,
                rows: self.grid.rows(),
                cols: self.grid.cols(),
            });
        }
        Ok(())
    }

    fn check_column(&self, col: usize) -> Result<(), EngineError> {
        if col >= self.grid.cols() {
            return Err(EngineError::ColumnOutOfRange {
                col,
                cols: self.grid.cols(),
            });
        }
        Ok(())
    }

    /// Start the scheduler at the given audio-clock time. Idempotent; a
    /// restart continues from the preserved subdivision phase.
    pub fn start(&mut self, now: f64) {
        if self.clock.start(&mut self.transport, now) {
            info!(now, "scheduler started");
        }
    }

    /// Suspend the scheduler, preserving transport phase and tempo
    pub fn stop(&mut self) {
        if self.clock.is_running() {
            self.clock.stop();
            info!("scheduler stopped");
        }
    }

    /// One control-rate poll at the given audio-clock time.
    ///
    /// Reaps naturally-ended voices first so their cells can relaunch in
    /// the same tick, then realizes every subdivision inside the
    /// schedule-ahead window. A failure on one cell never blocks the rest
    /// of the tick.
    pub fn tick(&mut self, now: f64) {
        for (row, col) in self.voices.reap_ended() {
            if let Some(cell) = self.grid.cell_mut(row, col) {
                if cell.voice_ended() {
                    debug!(row, col, "voice ended naturally");
                    self.callbacks.cell_state_changed(row, col, CellState::Stopped);
                }
            }
        }

        let Self {
            grid,
            transport,
            clock,
            controls: _,
            voices,
            callbacks,
        } = self;

        let cols = grid.cols();
        clock.poll(transport, now, cols, |transport, timestamp| {
            if transport.at_boundary() {
                Self::realize_boundary(grid, voices, callbacks, transport.tempo_bpm, timestamp);
            }
            callbacks.transport_advanced((transport.subdivision_index + 1) % cols);
        });
    }

    /// Commit every queued cell intent at a boundary timestamp
    fn realize_boundary(
        grid: &mut Grid,
        voices: &mut VoiceManager,
        callbacks: &mut Callbacks,
        tempo_bpm: f64,
        timestamp: f64,
    ) {
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                let Some(cell) = grid.cell_mut(row, col) else {
                    continue;
                };
                let Some(commit) = cell.commit_boundary() else {
                    continue;
                };
                match commit {
                    BoundaryCommit::Start => {
                        let volume = cell.volume();
                        if let Some(sample) = cell.sample().cloned() {
                            if let Err(e) =
                                voices.start_voice(row, col, &sample, volume, tempo_bpm, timestamp)
                            {
                                warn!(row, col, error = %e, "failed to start voice");
                            }
                        }
                        callbacks.cell_state_changed(row, col, CellState::Playing);
                    }
                    BoundaryCommit::Stop => {
                        if let Err(e) = voices.stop_voice(row, col) {
                            warn!(row, col, error = %e, "failed to stop voice");
                        }
                        callbacks.cell_state_changed(row, col, CellState::Stopped);
                    }
                }
            }
        }
    }

    /// Apply a user trigger to the cell.
    ///
    /// Start/stop intents are queued for the next boundary; cancel paths
    /// take effect immediately. Triggering an empty cell only raises the
    /// sample-request callback.
    pub fn trigger(&mut self, row: usize, col: usize) -> Result<(), EngineError> {
        self.check_cell(row, col)?;
        let cell = self.grid.cell_mut(row, col).expect("cell bounds checked");
        let effect = cell.trigger();
        let state = cell.state();

        match effect {
            TriggerEffect::Queued | TriggerEffect::CanceledStart => {
                self.callbacks.cell_state_changed(row, col, state);
            }
            TriggerEffect::StopVoiceNow => {
                self.voices.stop_voice(row, col)?;
                self.callbacks.cell_state_changed(row, col, state);
            }
            TriggerEffect::SampleRequired => {
                self.callbacks.sample_requested(row, col);
            }
        }
        Ok(())
    }

    /// Replace the tempo. Live voices are retuned from their load-time
    /// normalization; future subdivisions pick up the new duration.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<(), EngineError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(EngineError::InvalidTempo(bpm));
        }
        self.transport.tempo_bpm = bpm;
        self.voices.retune_all(&self.grid, bpm)?;
        debug!(bpm, "tempo changed");
        Ok(())
    }

    /// Persist a cell volume and update its live voice, if any
    pub fn set_cell_volume(&mut self, row: usize, col: usize, volume: f32) -> Result<(), EngineError> {
        self.check_cell(row, col)?;
        let cell = self.grid.cell_mut(row, col).expect("cell bounds checked");
        cell.set_volume(volume);
        let clamped = cell.volume();
        self.voices.set_live_volume(row, col, clamped)?;
        Ok(())
    }

    /// Toggle mute for a column and reapply the gain automation
    pub fn toggle_mute(&mut self, col: usize) -> Result<(), EngineError> {
        self.check_column(col)?;
        self.controls.toggle_mute(col);
        self.voices.apply_mute_solo(&self.grid, &self.controls)?;
        Ok(())
    }

    /// Toggle solo for a column (exclusive) and reapply the gain automation
    pub fn toggle_solo(&mut self, col: usize) -> Result<(), EngineError> {
        self.check_column(col)?;
        self.controls.toggle_solo(col);
        self.voices.apply_mute_solo(&self.grid, &self.controls)?;
        Ok(())
    }

    /// Tear down every voice and reset every cell to `Stopped`.
    /// The tempo and transport phase are preserved.
    pub fn stop_all(&mut self) -> Result<(), EngineError> {
        self.voices.stop_all()?;
        let changed: Vec<(usize, usize)> = self
            .grid
            .iter_mut()
            .filter_map(|(row, col, cell)| cell.force_stop().then_some((row, col)))
            .collect();
        for (row, col) in changed {
            self.callbacks.cell_state_changed(row, col, CellState::Stopped);
        }
        Ok(())
    }

    /// Clear the grid entirely: all voices stopped, cells emptied, and the
    /// transport reset to phase zero at the default tempo.
    pub fn clear_grid(&mut self) -> Result<(), EngineError> {
        self.stop_all()?;
        self.grid.clear_all();
        self.transport.reset();
        info!("grid cleared");
        Ok(())
    }

    /// Put a sample into a cell. Any live voice for the cell is stopped
    /// and its launch state reset before the handle is swapped in.
    pub fn assign_sample(
        &mut self,
        row: usize,
        col: usize,
        sample: Arc<SampleHandle>,
    ) -> Result<(), EngineError> {
        self.check_cell(row, col)?;
        self.voices.stop_voice(row, col)?;
        let cell = self.grid.cell_mut(row, col).expect("cell bounds checked");
        cell.assign_sample(sample);
        self.callbacks.cell_state_changed(row, col, CellState::Stopped);
        Ok(())
    }

    /// Capture the durable state as a preset
    pub fn snapshot(&self) -> Preset {
        let mut preset = Preset::empty(self.grid.rows(), self.grid.cols());
        preset.tempo = self.transport.tempo_bpm;
        for (row, col, cell) in self.grid.iter() {
            preset.cells[row][col] = CellPreset {
                sample_path: cell.sample().map(|s| s.path().to_path_buf()),
                volume: cell.volume(),
            };
        }
        preset.track_mutes = self.controls.mutes().to_vec();
        preset.track_solos = self.controls.solos().to_vec();
        preset
    }

    /// Restore a preset.
    ///
    /// Validation happens before any mutation, so a malformed or
    /// mismatched preset leaves the engine untouched. Per-cell sample
    /// load failures leave that cell empty and continue; the paths that
    /// failed are returned for display.
    pub fn restore(
        &mut self,
        preset: &Preset,
        provider: &dyn SampleProvider,
    ) -> Result<Vec<PathBuf>, PresetError> {
        preset.validate_for(self.grid.rows(), self.grid.cols())?;

        if let Err(e) = self.stop_all() {
            warn!(error = %e, "failed to stop voices before restore");
        }
        self.transport.tempo_bpm = preset.tempo;
        // Runtime-only state never survives a load
        self.transport.subdivision_index = 0;
        self.controls.restore(&preset.track_mutes, &preset.track_solos);

        let mut failed = Vec::new();
        for (row, cells) in preset.cells.iter().enumerate() {
            for (col, stored) in cells.iter().enumerate() {
                let cell = self.grid.cell_mut(row, col).expect("dimensions validated");
                cell.clear();
                cell.set_volume(stored.volume);
                if let Some(path) = &stored.sample_path {
                    match provider.load(path) {
                        Ok(sample) => cell.assign_sample(sample),
                        Err(e) => {
                            warn!(row, col, path = %path.display(), error = %e, "sample load failed");
                            failed.push(path.clone());
                        }
                    }
                }
            }
        }

        info!(tempo = preset.tempo, "preset restored");
        Ok(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SR: u32 = 1000;

    fn test_engine(rows: usize, cols: usize) -> (Engine, Arc<Mutex<Mixer>>) {
        let mixer = Arc::new(Mutex::new(Mixer::new(SR, 1)));
        let config = EngineConfig {
            rows,
            cols,
            ..Default::default()
        };
        (Engine::new(&config, Arc::clone(&mixer)), mixer)
    }

    fn two_bar_sample() -> Arc<SampleHandle> {
        Arc::new(SampleHandle::from_frames(
            "loop.wav",
            "loop.wav",
            vec![0.5; 4000],
            1,
            SR,
        ))
    }

    /// Advance far enough to pass at least one launch boundary
    fn run_past_boundary(engine: &mut Engine, from: f64) -> f64 {
        let cycle = engine.transport().subdivision_duration() * engine.grid().cols() as f64;
        let until = from + cycle + 0.2;
        engine.tick(until);
        until
    }

    #[test]
    fn test_trigger_out_of_range() {
        let (mut engine, _) = test_engine(2, 2);
        assert!(matches!(
            engine.trigger(2, 0),
            Err(EngineError::CellOutOfRange { .. })
        ));
    }

    #[test]
    fn test_empty_cell_requests_sample() {
        let (mut engine, _) = test_engine(2, 2);
        let requests = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&requests);
        engine.on_sample_requested(Box::new(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        engine.trigger(0, 0).unwrap();

        assert_eq!(requests.load(Ordering::SeqCst), 1);
        assert_eq!(engine.grid().cell(0, 0).unwrap().state(), CellState::Stopped);
    }

    #[test]
    fn test_launch_cycle_creates_one_voice() {
        let (mut engine, mixer) = test_engine(2, 2);
        engine.assign_sample(0, 0, two_bar_sample()).unwrap();

        engine.start(0.0);
        engine.trigger(0, 0).unwrap();
        assert_eq!(engine.grid().cell(0, 0).unwrap().state(), CellState::Pending);

        let now = run_past_boundary(&mut engine, 0.0);
        assert_eq!(engine.grid().cell(0, 0).unwrap().state(), CellState::Playing);
        assert_eq!(mixer.lock().unwrap().voice_count(), 1);

        engine.trigger(0, 0).unwrap();
        assert_eq!(engine.grid().cell(0, 0).unwrap().state(), CellState::Stopping);

        run_past_boundary(&mut engine, now);
        assert_eq!(engine.grid().cell(0, 0).unwrap().state(), CellState::Stopped);
        assert_eq!(mixer.lock().unwrap().voice_count(), 0);
    }

    #[test]
    fn test_cancel_before_boundary_creates_no_voice() {
        let (mut engine, mixer) = test_engine(2, 2);
        engine.assign_sample(0, 0, two_bar_sample()).unwrap();

        engine.start(0.0);
        engine.trigger(0, 0).unwrap();
        engine.trigger(0, 0).unwrap();

        run_past_boundary(&mut engine, 0.0);
        assert_eq!(engine.grid().cell(0, 0).unwrap().state(), CellState::Stopped);
        assert_eq!(mixer.lock().unwrap().voice_count(), 0);
    }

    #[test]
    fn test_set_tempo_rejects_invalid() {
        let (mut engine, _) = test_engine(2, 2);
        assert!(matches!(
            engine.set_tempo(0.0),
            Err(EngineError::InvalidTempo(_))
        ));
        assert!(matches!(
            engine.set_tempo(f64::NAN),
            Err(EngineError::InvalidTempo(_))
        ));
        assert_eq!(engine.tempo(), 120.0);
    }

    #[test]
    fn test_stop_all_preserves_tempo() {
        let (mut engine, mixer) = test_engine(2, 2);
        engine.assign_sample(0, 0, two_bar_sample()).unwrap();
        engine.set_tempo(140.0).unwrap();

        engine.start(0.0);
        engine.trigger(0, 0).unwrap();
        run_past_boundary(&mut engine, 0.0);
        assert_eq!(mixer.lock().unwrap().voice_count(), 1);

        engine.stop_all().unwrap();

        assert_eq!(mixer.lock().unwrap().voice_count(), 0);
        assert_eq!(engine.grid().cell(0, 0).unwrap().state(), CellState::Stopped);
        assert_eq!(engine.tempo(), 140.0);
    }

    #[test]
    fn test_clear_grid_resets_transport() {
        let (mut engine, _) = test_engine(2, 2);
        engine.assign_sample(0, 0, two_bar_sample()).unwrap();
        engine.set_tempo(150.0).unwrap();
        engine.start(0.0);
        engine.tick(0.2);

        engine.clear_grid().unwrap();

        assert_eq!(engine.tempo(), 120.0);
        assert_eq!(engine.transport().subdivision_index, 0);
        assert!(engine.grid().cell(0, 0).unwrap().sample().is_none());
    }

    #[test]
    fn test_stop_resume_preserves_phase() {
        let (mut engine, _) = test_engine(2, 4);
        engine.start(0.0);
        engine.tick(0.2);
        let phase = engine.transport().subdivision_index;

        engine.stop();
        assert!(!engine.is_running());

        engine.start(10.0);
        assert_eq!(engine.transport().subdivision_index, phase);
        assert!((engine.transport().next_event_time - 10.1).abs() < 1e-9);
    }

    #[test]
    fn test_transport_callback_reports_subdivisions() {
        let (mut engine, _) = test_engine(2, 4);
        let beats = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&beats);
        engine.on_transport_advanced(Box::new(move |beat| {
            sink.lock().unwrap().push(beat);
        }));

        engine.start(0.0);
        // Window covers subdivisions at 0.1, 0.225, 0.35, 0.475
        engine.tick(0.5);

        assert_eq!(*beats.lock().unwrap(), vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        struct StubProvider;
        impl SampleProvider for StubProvider {
            fn load(
                &self,
                path: &std::path::Path,
            ) -> Result<Arc<SampleHandle>, crate::sample::SampleLoadError> {
                Ok(Arc::new(SampleHandle::from_frames(
                    "stub.wav",
                    path,
                    vec![0.1; 2000],
                    1,
                    SR,
                )))
            }
        }

        let (mut engine, _) = test_engine(2, 2);
        engine.assign_sample(0, 1, two_bar_sample()).unwrap();
        engine.set_cell_volume(0, 1, 0.6).unwrap();
        engine.set_tempo(95.0).unwrap();
        engine.toggle_mute(0).unwrap();

        let preset = engine.snapshot();

        let (mut other, _) = test_engine(2, 2);
        let failed = other.restore(&preset, &StubProvider).unwrap();
        assert!(failed.is_empty());

        assert_eq!(other.tempo(), 95.0);
        assert!(other.controls().is_muted(0));
        let cell = other.grid().cell(0, 1).unwrap();
        assert!((cell.volume() - 0.6).abs() < 1e-6);
        assert_eq!(
            cell.sample().unwrap().path(),
            std::path::Path::new("loop.wav")
        );
        assert_eq!(other.snapshot(), preset);
    }

    #[test]
    fn test_restore_dimension_mismatch_is_atomic() {
        struct FailProvider;
        impl SampleProvider for FailProvider {
            fn load(
                &self,
                path: &std::path::Path,
            ) -> Result<Arc<SampleHandle>, crate::sample::SampleLoadError> {
                Err(crate::sample::SampleLoadError::Empty {
                    path: path.to_path_buf(),
                })
            }
        }

        let (mut engine, _) = test_engine(2, 2);
        engine.set_tempo(77.0).unwrap();

        let preset = Preset::empty(4, 4);
        let err = engine.restore(&preset, &FailProvider).unwrap_err();
        assert!(matches!(err, PresetError::DimensionMismatch { .. }));
        assert_eq!(engine.tempo(), 77.0);
    }

    #[test]
    fn test_restore_reports_failed_samples() {
        struct FailProvider;
        impl SampleProvider for FailProvider {
            fn load(
                &self,
                path: &std::path::Path,
            ) -> Result<Arc<SampleHandle>, crate::sample::SampleLoadError> {
                Err(crate::sample::SampleLoadError::Empty {
                    path: path.to_path_buf(),
                })
            }
        }

        let (mut engine, _) = test_engine(1, 1);
        let mut preset = Preset::empty(1, 1);
        preset.cells[0][0].sample_path = Some(PathBuf::from("broken.wav"));

        let failed = engine.restore(&preset, &FailProvider).unwrap();

        assert_eq!(failed, vec![PathBuf::from("broken.wav")]);
        assert!(engine.grid().cell(0, 0).unwrap().sample().is_none());
    }
}
