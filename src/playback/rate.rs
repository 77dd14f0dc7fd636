// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback-rate normalization.
//!
//! A loop sample of arbitrary length is assumed to represent a whole number
//! of 4/4 bars. Three related computations share that assumption but are
//! deliberately separate code paths:
//! - at load time, a tempo-independent rate against the fixed 120 BPM
//!   reference bar;
//! - at voice start, a rate against the current tempo;
//! - on tempo change, a linear rescale of the load-time rate for voices
//!   that are already playing.
//!
//! The load-time matcher uses the doubling series {1, 2, 4, 8} bars while
//! the start-time matcher uses consecutive counts {1, 2, 3, 4}; the two
//! candidate sets are kept separate on purpose and must not be merged.

use crate::timing::REFERENCE_TEMPO_BPM;

/// One 4/4 bar at the 120 BPM reference tempo, in seconds
pub const REFERENCE_BAR_SECONDS: f64 = 2.0;

/// Bar-count candidates for load-time matching
const LOAD_BAR_MULTIPLES: [f64; 4] = [1.0, 2.0, 4.0, 8.0];

/// Bar-count candidates for start-time matching
const START_BAR_MULTIPLES: [f64; 4] = [1.0, 2.0, 3.0, 4.0];

/// Duration of one 4/4 bar at `tempo_bpm`, in seconds
pub fn bar_seconds(tempo_bpm: f64) -> f64 {
    (60.0 / tempo_bpm) * 4.0
}

/// Pick the candidate duration closest to `duration`; ties keep the
/// earlier candidate.
fn closest_duration(duration: f64, candidates: impl Iterator<Item = f64>) -> f64 {
    let mut candidates = candidates;
    let first = candidates.next().expect("candidate set is never empty");
    candidates.fold(first, |prev, curr| {
        if (curr - duration).abs() < (prev - duration).abs() {
            curr
        } else {
            prev
        }
    })
}

/// Load-time normalization: rate that fits the sample onto the nearest of
/// {1, 2, 4, 8} bars at the fixed reference tempo.
pub fn reference_rate(natural_duration_seconds: f64) -> f64 {
    let matched = closest_duration(
        natural_duration_seconds,
        LOAD_BAR_MULTIPLES.iter().map(|m| m * REFERENCE_BAR_SECONDS),
    );
    natural_duration_seconds / matched
}

/// Start-time rate: fits the sample onto the nearest of {1, 2, 3, 4} bars
/// at the current tempo, so the loop fills exactly that many bars.
pub fn start_rate(natural_duration_seconds: f64, tempo_bpm: f64) -> f64 {
    let bar = bar_seconds(tempo_bpm);
    let matched = closest_duration(
        natural_duration_seconds,
        START_BAR_MULTIPLES.iter().map(|m| m * bar),
    );
    natural_duration_seconds / matched
}

/// Retune formula for voices already playing when the tempo changes:
/// the load-time rate scaled by the tempo ratio.
pub fn retuned_rate(reference_playback_rate: f64, tempo_bpm: f64) -> f64 {
    reference_playback_rate * (tempo_bpm / REFERENCE_TEMPO_BPM)
}
