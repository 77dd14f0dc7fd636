// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Control-thread runner.
//!
//! The engine is single-writer: every mutation must happen on one thread.
//! The runner owns the engine on a dedicated control thread, drains a
//! command queue each poll, and ticks the lookahead clock. External
//! producers (UI, network) only ever hold the sender side of the queue.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use tracing::{info, warn};

use crate::audio::Mixer;
use crate::sample::SampleProvider;

use super::Engine;

/// Commands marshaled onto the control thread
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Start the scheduler
    Start,
    /// Suspend the scheduler
    Stop,
    /// Trigger a cell
    Trigger { row: usize, col: usize },
    /// Replace the tempo
    SetTempo(f64),
    /// Persist a cell volume and update its live voice
    SetCellVolume { row: usize, col: usize, volume: f32 },
    /// Toggle mute for a column
    ToggleMute(usize),
    /// Toggle solo for a column
    ToggleSolo(usize),
    /// Tear down every voice and reset every cell
    StopAll,
    /// Empty the grid and reset the transport
    ClearGrid,
    /// Load a sample into a cell
    AssignSample { row: usize, col: usize, path: PathBuf },
    /// Stop the control thread
    Shutdown,
}

/// Time source for the control loop.
///
/// The audio clock is authoritative while an output stream is running;
/// without one (headless operation) wall-clock time stands in so the
/// scheduler still advances.
pub enum ControlClock {
    /// Frames rendered by the shared mixer
    Audio(Arc<Mutex<Mixer>>),
    /// Wall-clock seconds since the given instant
    Wall(Instant),
}

impl ControlClock {
    /// Current time in seconds
    pub fn now(&self) -> f64 {
        match self {
            ControlClock::Audio(mixer) => match mixer.lock() {
                Ok(mixer) => mixer.clock_seconds(),
                Err(_) => 0.0,
            },
            ControlClock::Wall(epoch) => epoch.elapsed().as_secs_f64(),
        }
    }
}

/// Handle to the control thread
pub struct EngineController {
    tx: Sender<EngineCommand>,
    handle: Option<JoinHandle<()>>,
}

impl EngineController {
    /// Move the engine onto a new control thread.
    ///
    /// The thread drains queued commands, ticks the clock, and sleeps for
    /// the lookahead interval until shut down.
    pub fn spawn(
        mut engine: Engine,
        clock: ControlClock,
        provider: Box<dyn SampleProvider + Send>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            info!("control thread started");
            control_loop(&mut engine, &clock, provider.as_ref(), &rx);
            info!("control thread stopped");
        });
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Queue a command for the control thread
    pub fn send(&self, command: EngineCommand) -> anyhow::Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow::anyhow!("control thread is gone"))
    }

    /// Stop the control thread and wait for it to exit
    pub fn shutdown(mut self) {
        let _ = self.tx.send(EngineCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EngineController {
    fn drop(&mut self) {
        let _ = self.tx.send(EngineCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn control_loop(
    engine: &mut Engine,
    clock: &ControlClock,
    provider: &dyn SampleProvider,
    rx: &Receiver<EngineCommand>,
) {
    loop {
        loop {
            match rx.try_recv() {
                Ok(EngineCommand::Shutdown) => return,
                Ok(command) => apply_command(engine, clock, provider, command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        engine.tick(clock.now());
        std::thread::sleep(engine.poll_interval());
    }
}

fn apply_command(
    engine: &mut Engine,
    clock: &ControlClock,
    provider: &dyn SampleProvider,
    command: EngineCommand,
) {
    let result = match command {
        EngineCommand::Start => {
            engine.start(clock.now());
            Ok(())
        }
        EngineCommand::Stop => {
            engine.stop();
            Ok(())
        }
        EngineCommand::Trigger { row, col } => engine.trigger(row, col),
        EngineCommand::SetTempo(bpm) => engine.set_tempo(bpm),
        EngineCommand::SetCellVolume { row, col, volume } => {
            engine.set_cell_volume(row, col, volume)
        }
        EngineCommand::ToggleMute(col) => engine.toggle_mute(col),
        EngineCommand::ToggleSolo(col) => engine.toggle_solo(col),
        EngineCommand::StopAll => engine.stop_all(),
        EngineCommand::ClearGrid => engine.clear_grid(),
        EngineCommand::AssignSample { row, col, path } => match provider.load(&path) {
            Ok(sample) => engine.assign_sample(row, col, sample),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "sample load failed");
                Ok(())
            }
        },
        EngineCommand::Shutdown => unreachable!("handled by the loop"),
    };

    if let Err(e) = result {
        warn!(error = %e, "command rejected");
    }
}
