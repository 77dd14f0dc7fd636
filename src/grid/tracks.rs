// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Per-column mute/solo controls.
//!
//! Solo is exclusive: at most one column is soloed at a time, and soloing a
//! column force-mutes every other column. Audibility for the gain automation
//! is derived from both flags.

/// Mute/solo flags for every column of the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackControls {
    muted: Vec<bool>,
    soloed: Vec<bool>,
}

impl TrackControls {
    /// Create controls for `cols` columns, all unmuted and unsoloed
    pub fn new(cols: usize) -> Self {
        Self {
            muted: vec![false; cols],
            soloed: vec![false; cols],
        }
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.muted.len()
    }

    /// True when there are no columns
    pub fn is_empty(&self) -> bool {
        self.muted.is_empty()
    }

    /// Whether `col` is muted
    pub fn is_muted(&self, col: usize) -> bool {
        self.muted.get(col).copied().unwrap_or(false)
    }

    /// Whether `col` is soloed
    pub fn is_soloed(&self, col: usize) -> bool {
        self.soloed.get(col).copied().unwrap_or(false)
    }

    /// Whether any column is soloed
    pub fn any_soloed(&self) -> bool {
        self.soloed.iter().any(|s| *s)
    }

    /// Whether voices in `col` should be heard: muted columns are silent,
    /// and while any column is soloed only that column passes.
    pub fn column_audible(&self, col: usize) -> bool {
        if self.is_muted(col) {
            false
        } else {
            !self.any_soloed() || self.is_soloed(col)
        }
    }

    /// Toggle mute for `col`. Muting a soloed column also unsolos it.
    pub fn toggle_mute(&mut self, col: usize) {
        if col >= self.muted.len() {
            return;
        }
        self.muted[col] = !self.muted[col];
        if self.muted[col] && self.soloed[col] {
            self.soloed[col] = false;
        }
    }

    /// Toggle solo for `col`.
    ///
    /// Turning solo on force-mutes and unsolos every other column and
    /// unmutes `col` itself. Turning it off unmutes all columns when no
    /// other column remains soloed.
    pub fn toggle_solo(&mut self, col: usize) {
        if col >= self.soloed.len() {
            return;
        }
        if !self.soloed[col] {
            for other in 0..self.soloed.len() {
                if other != col {
                    self.soloed[other] = false;
                    self.muted[other] = true;
                }
            }
            self.soloed[col] = true;
            self.muted[col] = false;
        } else {
            self.soloed[col] = false;
            if !self.any_soloed() {
                for m in &mut self.muted {
                    *m = false;
                }
            }
        }
    }

    /// Mute flags for persistence
    pub fn mutes(&self) -> &[bool] {
        &self.muted
    }

    /// Solo flags for persistence
    pub fn solos(&self) -> &[bool] {
        &self.soloed
    }

    /// Restore flags from persisted arrays.
    ///
    /// Arrays shorter than the column count are padded with false, longer
    /// ones truncated. If the stored data claims more than one soloed
    /// column, only the first is kept.
    pub fn restore(&mut self, mutes: &[bool], solos: &[bool]) {
        let cols = self.muted.len();
        for col in 0..cols {
            self.muted[col] = mutes.get(col).copied().unwrap_or(false);
            self.soloed[col] = solos.get(col).copied().unwrap_or(false);
        }
        let mut seen_solo = false;
        for s in &mut self.soloed {
            if *s {
                if seen_solo {
                    *s = false;
                } else {
                    seen_solo = true;
                }
            }
        }
    }

    /// Clear every flag back to pass-through
    pub fn reset(&mut self) {
        self.muted.iter_mut().for_each(|m| *m = false);
        self.soloed.iter_mut().for_each(|s| *s = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_through() {
        let controls = TrackControls::new(4);
        for col in 0..4 {
            assert!(controls.column_audible(col));
        }
    }

    #[test]
    fn test_mute_silences_column() {
        let mut controls = TrackControls::new(4);
        controls.toggle_mute(1);

        assert!(controls.is_muted(1));
        assert!(!controls.column_audible(1));
        assert!(controls.column_audible(0));
    }

    #[test]
    fn test_solo_force_mutes_others() {
        let mut controls = TrackControls::new(4);
        controls.toggle_solo(2);

        assert!(controls.is_soloed(2));
        assert!(!controls.is_muted(2));
        for col in [0, 1, 3] {
            assert!(controls.is_muted(col));
            assert!(!controls.is_soloed(col));
            assert!(!controls.column_audible(col));
        }
        assert!(controls.column_audible(2));
    }

    #[test]
    fn test_solo_is_exclusive() {
        let mut controls = TrackControls::new(4);
        controls.toggle_solo(0);
        controls.toggle_solo(3);

        assert!(!controls.is_soloed(0));
        assert!(controls.is_soloed(3));
        assert_eq!(controls.solos().iter().filter(|s| **s).count(), 1);
        assert!(controls.is_muted(0));
        assert!(!controls.is_muted(3));
    }

    #[test]
    fn test_solo_off_unmutes_all() {
        let mut controls = TrackControls::new(4);
        controls.toggle_solo(1);
        controls.toggle_solo(1);

        assert!(!controls.any_soloed());
        for col in 0..4 {
            assert!(!controls.is_muted(col));
            assert!(controls.column_audible(col));
        }
    }

    #[test]
    fn test_mute_on_soloed_column_unsolos() {
        let mut controls = TrackControls::new(4);
        controls.toggle_solo(2);
        controls.toggle_mute(2);

        assert!(controls.is_muted(2));
        assert!(!controls.is_soloed(2));
        // Other columns keep the forced mute until explicitly cleared
        assert!(controls.is_muted(0));
    }

    #[test]
    fn test_unsoloed_column_muted_while_other_soloed() {
        let mut controls = TrackControls::new(3);
        controls.toggle_solo(0);
        // Unmute column 1 by hand: still inaudible because 0 is soloed
        controls.toggle_mute(1);
        assert!(!controls.is_muted(1));
        assert!(!controls.column_audible(1));
    }

    #[test]
    fn test_restore_defensive_defaults() {
        let mut controls = TrackControls::new(4);
        controls.restore(&[true], &[]);

        assert!(controls.is_muted(0));
        for col in 1..4 {
            assert!(!controls.is_muted(col));
        }
        assert!(!controls.any_soloed());
    }

    #[test]
    fn test_restore_keeps_single_solo() {
        let mut controls = TrackControls::new(4);
        controls.restore(&[false; 4], &[true, false, true, false]);

        assert!(controls.is_soloed(0));
        assert!(!controls.is_soloed(2));
    }

    #[test]
    fn test_reset() {
        let mut controls = TrackControls::new(4);
        controls.toggle_solo(1);
        controls.reset();

        assert!(!controls.any_soloed());
        assert!((0..4).all(|c| controls.column_audible(c)));
    }
}
