// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Lookahead clock.
//!
//! Converts a coarse, jitter-prone control-rate poll into precisely
//! timestamped subdivision events. On each poll the clock walks the
//! transport forward through every subdivision that falls inside the
//! schedule-ahead window, handing each one to the caller with its
//! audio-clock timestamp before the event time is reached.

use std::time::Duration;

use super::Transport;

/// Configuration for the lookahead clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockConfig {
    /// Control-rate poll period
    pub lookahead_interval: Duration,
    /// How far past the audio clock events may be pre-scheduled, in seconds
    pub schedule_ahead: f64,
    /// Gap between starting and the first scheduled subdivision, in seconds
    pub start_delay: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            lookahead_interval: Duration::from_millis(25),
            schedule_ahead: 0.1,
            start_delay: 0.1,
        }
    }
}

/// Lookahead clock driving boundary-quantized event realization.
///
/// Starting is idempotent. Stopping suspends polling but preserves the
/// transport's subdivision phase; a later start re-anchors the next-event
/// timestamp to the current audio clock and continues from the same phase.
#[derive(Debug)]
pub struct LookaheadClock {
    config: ClockConfig,
    running: bool,
}

impl LookaheadClock {
    /// Create a stopped clock
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            running: false,
        }
    }

    /// Start polling. Returns false (and changes nothing) if already running.
    pub fn start(&mut self, transport: &mut Transport, now: f64) -> bool {
        if self.running {
            return false;
        }
        transport.next_event_time = now + self.config.start_delay;
        self.running = true;
        true
    }

    /// Suspend polling. Subdivision phase and tempo are untouched.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether the clock is currently polling
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Recommended sleep between polls
    pub fn poll_interval(&self) -> Duration {
        self.config.lookahead_interval
    }

    /// Walk the transport through every subdivision inside the window.
    ///
    /// `on_subdivision` receives the transport (still at the subdivision
    /// being realized) and that subdivision's timestamp; the transport is
    /// advanced afterwards. Returns the number of subdivisions realized.
    pub fn poll<F>(&mut self, transport: &mut Transport, now: f64, cols: usize, mut on_subdivision: F) -> usize
    where
        F: FnMut(&Transport, f64),
    {
        if !self.running {
            return 0;
        }

        let mut realized = 0;
        while transport.next_event_time < now + self.config.schedule_ahead {
            let timestamp = transport.next_event_time;
            on_subdivision(transport, timestamp);
            transport.advance(cols);
            realized += 1;
        }
        realized
    }
}
