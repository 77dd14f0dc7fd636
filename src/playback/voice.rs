// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Live voice ownership and gain automation.
//!
//! The voice manager is the control-side owner of every live voice. It
//! maps cells to voice ids, enforces the one-voice-per-cell rule, derives
//! gains from the perceptual volume curve, and pushes rate and gain
//! updates into the shared mixer.

use std::sync::{Arc, Mutex};

use crate::audio::{AudioError, Mixer, VoiceId};
use crate::grid::{Grid, TrackControls};
use crate::playback::rate;
use crate::sample::SampleHandle;

/// Perceptual gain curve: squared volume, not linear and not dB
fn perceptual_gain(volume: f32) -> f32 {
    volume * volume
}

/// Owns the live voices, one slot per cell.
pub struct VoiceManager {
    mixer: Arc<Mutex<Mixer>>,
    slots: Vec<Option<VoiceId>>,
    cols: usize,
    next_id: VoiceId,
}

impl VoiceManager {
    /// Create a manager for a rows x cols grid
    pub fn new(mixer: Arc<Mutex<Mixer>>, rows: usize, cols: usize) -> Self {
        Self {
            mixer,
            slots: vec![None; rows * cols],
            cols,
            next_id: 0,
        }
    }

    fn slot(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Mixer>, AudioError> {
        self.mixer.lock().map_err(|_| AudioError::LockFailed)
    }

    /// Whether the cell currently owns a live voice
    pub fn has_voice(&self, row: usize, col: usize) -> bool {
        self.slots[self.slot(row, col)].is_some()
    }

    /// Voice id for the cell, if live
    pub fn voice_id(&self, row: usize, col: usize) -> Option<VoiceId> {
        self.slots[self.slot(row, col)]
    }

    /// Number of live voices
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Start a looping voice for the cell at the boundary timestamp.
    ///
    /// Any prior voice for the same cell is stopped and discarded first,
    /// so at most one voice per cell is ever alive. The rate is matched
    /// against the current tempo; the gain is the squared cell volume.
    pub fn start_voice(
        &mut self,
        row: usize,
        col: usize,
        sample: &Arc<SampleHandle>,
        volume: f32,
        tempo_bpm: f64,
        at: f64,
    ) -> Result<VoiceId, AudioError> {
        let slot = self.slot(row, col);
        let previous = self.slots[slot].take();

        let id = self.next_id;
        let playback_rate = rate::start_rate(sample.natural_duration_seconds(), tempo_bpm);

        {
            let mut mixer = self.lock()?;
            if let Some(old) = previous {
                mixer.stop_voice(old);
            }
            mixer.spawn_voice(id, Arc::clone(sample), playback_rate, perceptual_gain(volume), at);
        }

        self.next_id += 1;
        self.slots[slot] = Some(id);
        Ok(id)
    }

    /// Immediately halt and discard the cell's voice. No-op when the cell
    /// has no live voice.
    pub fn stop_voice(&mut self, row: usize, col: usize) -> Result<(), AudioError> {
        let slot = self.slot(row, col);
        if let Some(id) = self.slots[slot].take() {
            self.lock()?.stop_voice(id);
        }
        Ok(())
    }

    /// Update a live voice's gain to the squared volume without
    /// interrupting playback. No-op when the cell has no live voice.
    pub fn set_live_volume(&mut self, row: usize, col: usize, volume: f32) -> Result<(), AudioError> {
        if let Some(id) = self.slots[self.slot(row, col)] {
            self.lock()?.set_voice_gain(id, perceptual_gain(volume));
        }
        Ok(())
    }

    /// Recompute every live voice's gain target from the mute/solo flags.
    ///
    /// Targets are approached with the mixer's smoothing constant so
    /// toggles ramp instead of clicking.
    pub fn apply_mute_solo(&mut self, grid: &Grid, controls: &TrackControls) -> Result<(), AudioError> {
        let mut mixer = self.lock()?;
        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(id) = slot {
                let row = idx / self.cols;
                let col = idx % self.cols;
                let volume = grid.cell(row, col).map(|c| c.volume()).unwrap_or(0.0);
                let target = if controls.column_audible(col) {
                    perceptual_gain(volume)
                } else {
                    0.0
                };
                mixer.set_voice_gain_target(*id, target);
            }
        }
        Ok(())
    }

    /// Rescale every live voice's rate after a tempo change, using the
    /// load-time normalization scaled by the tempo ratio.
    pub fn retune_all(&mut self, grid: &Grid, tempo_bpm: f64) -> Result<(), AudioError> {
        let mut mixer = self.lock()?;
        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(id) = slot {
                let row = idx / self.cols;
                let col = idx % self.cols;
                if let Some(sample) = grid.cell(row, col).and_then(|c| c.sample()) {
                    let new_rate = rate::retuned_rate(sample.reference_playback_rate(), tempo_bpm);
                    mixer.set_voice_rate(*id, new_rate);
                }
            }
        }
        Ok(())
    }

    /// Collect cells whose voices ended on their own and free their slots
    pub fn reap_ended(&mut self) -> Vec<(usize, usize)> {
        let ended_ids = match self.lock() {
            Ok(mut mixer) => mixer.take_ended(),
            Err(_) => return Vec::new(),
        };
        let mut cells = Vec::new();
        for id in ended_ids {
            if let Some(idx) = self.slots.iter().position(|s| *s == Some(id)) {
                self.slots[idx] = None;
                cells.push((idx / self.cols, idx % self.cols));
            }
        }
        cells
    }

    /// Tear down every live voice
    pub fn stop_all(&mut self) -> Result<(), AudioError> {
        let ids: Vec<VoiceId> = self.slots.iter_mut().filter_map(|s| s.take()).collect();
        let mut mixer = self.lock()?;
        for id in ids {
            mixer.stop_voice(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 1000;

    fn mixer() -> Arc<Mutex<Mixer>> {
        Arc::new(Mutex::new(Mixer::new(SR, 1)))
    }

    fn two_bar_sample() -> Arc<SampleHandle> {
        // 4.0 seconds = two reference bars at 120 BPM
        Arc::new(SampleHandle::from_frames(
            "loop.wav",
            "loop.wav",
            vec![0.5; 4000],
            1,
            SR,
        ))
    }

    fn grid_with_sample(rows: usize, cols: usize) -> Grid {
        let mut grid = Grid::new(rows, cols);
        for (_, _, cell) in grid.iter_mut() {
            cell.assign_sample(two_bar_sample());
        }
        grid
    }

    #[test]
    fn test_start_voice_applies_squared_volume() {
        let mixer = mixer();
        let mut voices = VoiceManager::new(Arc::clone(&mixer), 2, 2);
        let sample = two_bar_sample();

        let id = voices.start_voice(0, 0, &sample, 0.5, 120.0, 0.0).unwrap();

        let mixer = mixer.lock().unwrap();
        assert_eq!(mixer.voice_gain(id), Some(0.25));
        assert_eq!(mixer.voice_rate(id), Some(1.0));
    }

    #[test]
    fn test_one_voice_per_cell() {
        let mixer = mixer();
        let mut voices = VoiceManager::new(Arc::clone(&mixer), 2, 2);
        let sample = two_bar_sample();

        let first = voices.start_voice(1, 1, &sample, 1.0, 120.0, 0.0).unwrap();
        let second = voices.start_voice(1, 1, &sample, 1.0, 120.0, 2.0).unwrap();

        assert_ne!(first, second);
        let mixer = mixer.lock().unwrap();
        assert_eq!(mixer.voice_count(), 1);
        assert!(!mixer.has_voice(first));
        assert!(mixer.has_voice(second));
    }

    #[test]
    fn test_stop_voice_noop_when_empty() {
        let mixer = mixer();
        let mut voices = VoiceManager::new(mixer, 2, 2);
        assert!(voices.stop_voice(0, 1).is_ok());
        assert_eq!(voices.live_count(), 0);
    }

    #[test]
    fn test_set_live_volume() {
        let mixer = mixer();
        let mut voices = VoiceManager::new(Arc::clone(&mixer), 1, 1);
        let sample = two_bar_sample();
        let id = voices.start_voice(0, 0, &sample, 1.0, 120.0, 0.0).unwrap();

        voices.set_live_volume(0, 0, 0.8).unwrap();

        let mixer = mixer.lock().unwrap();
        let gain = mixer.voice_gain(id).unwrap();
        assert!((gain - 0.64).abs() < 1e-6);
    }

    #[test]
    fn test_apply_mute_solo_targets() {
        let mixer = mixer();
        let mut voices = VoiceManager::new(Arc::clone(&mixer), 1, 4);
        let grid = grid_with_sample(1, 4);
        let mut controls = TrackControls::new(4);

        let mut ids = Vec::new();
        for col in 0..4 {
            let sample = grid.cell(0, col).unwrap().sample().unwrap().clone();
            ids.push(voices.start_voice(0, col, &sample, 1.0, 120.0, 0.0).unwrap());
        }

        controls.toggle_solo(2);
        voices.apply_mute_solo(&grid, &controls).unwrap();

        let mixer = mixer.lock().unwrap();
        for (col, id) in ids.iter().enumerate() {
            let expected = if col == 2 { 1.0 } else { 0.0 };
            assert_eq!(mixer.voice_gain_target(*id), Some(expected));
        }
    }

    #[test]
    fn test_retune_all_uses_reference_rate() {
        let mixer = mixer();
        let mut voices = VoiceManager::new(Arc::clone(&mixer), 1, 1);
        let grid = grid_with_sample(1, 1);
        let sample = grid.cell(0, 0).unwrap().sample().unwrap().clone();

        let id = voices.start_voice(0, 0, &sample, 1.0, 120.0, 0.0).unwrap();
        voices.retune_all(&grid, 150.0).unwrap();

        let mixer = mixer.lock().unwrap();
        // reference rate 1.0 scaled by 150/120
        assert_eq!(mixer.voice_rate(id), Some(1.25));
    }

    #[test]
    fn test_reap_ended_frees_slot() {
        let mixer = mixer();
        let mut voices = VoiceManager::new(Arc::clone(&mixer), 2, 2);
        let sample = two_bar_sample();
        let id = voices.start_voice(1, 0, &sample, 1.0, 120.0, 0.0).unwrap();

        {
            let mut mixer = mixer.lock().unwrap();
            mixer.set_voice_looping(id, false);
            // Render past the end of the 4000-frame sample
            let mut out = vec![0.0; 5000];
            mixer.render(&mut out);
        }

        assert_eq!(voices.reap_ended(), vec![(1, 0)]);
        assert!(!voices.has_voice(1, 0));
    }

    #[test]
    fn test_stop_all() {
        let mixer = mixer();
        let mut voices = VoiceManager::new(Arc::clone(&mixer), 2, 2);
        let sample = two_bar_sample();
        for row in 0..2 {
            for col in 0..2 {
                voices.start_voice(row, col, &sample, 1.0, 120.0, 0.0).unwrap();
            }
        }
        assert_eq!(voices.live_count(), 4);

        voices.stop_all().unwrap();

        assert_eq!(voices.live_count(), 0);
        assert_eq!(mixer.lock().unwrap().voice_count(), 0);
    }
}
