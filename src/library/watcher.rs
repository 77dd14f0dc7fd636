// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! File watcher for the sample library.
//!
//! Watches the sample root for added or removed audio files so the
//! browser can refresh its listing without rescanning on every open.
//! Events are debounced; bursts of changes collapse into one event per
//! path.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Duration;

use anyhow::{anyhow, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::is_audio_file;

/// Events emitted by the library watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    /// An audio file appeared or changed
    FileChanged(PathBuf),
    /// An audio file was removed
    FileRemoved(PathBuf),
}

/// Sample-library watcher with debouncing
pub struct LibraryWatcher {
    _watcher: RecommendedWatcher,
    event_receiver: Receiver<LibraryEvent>,
    root: PathBuf,
}

impl LibraryWatcher {
    /// Watch the library rooted at `root`.
    ///
    /// `debounce_ms` collapses change bursts (default 500).
    pub fn new(root: impl Into<PathBuf>, debounce_ms: Option<u64>) -> Result<Self> {
        let root = root.into();
        let debounce = Duration::from_millis(debounce_ms.unwrap_or(500));

        let (event_tx, event_rx): (Sender<LibraryEvent>, Receiver<LibraryEvent>) = mpsc::channel();
        let (notify_tx, notify_rx): (Sender<Event>, Receiver<Event>) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            },
            Config::default(),
        )
        .map_err(|e| anyhow!("Failed to create file watcher: {}", e))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| anyhow!("Failed to watch path {:?}: {}", root, e))?;

        // Debounce thread: gather notify events, flush distinct paths
        // after a quiet period
        std::thread::spawn(move || {
            let mut pending: Vec<LibraryEvent> = Vec::new();

            loop {
                match notify_rx.recv_timeout(debounce) {
                    Ok(event) => {
                        let converted = convert_event(&event);
                        for library_event in converted {
                            if !pending.contains(&library_event) {
                                pending.push(library_event);
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        for event in pending.drain(..) {
                            if event_tx.send(event).is_err() {
                                return;
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        return;
                    }
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            event_receiver: event_rx,
            root,
        })
    }

    /// Watched root directory
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Drain any pending events without blocking
    pub fn poll_events(&self) -> Vec<LibraryEvent> {
        let mut events = Vec::new();
        loop {
            match self.event_receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Block up to `timeout` for the next event
    pub fn wait_event(&self, timeout: Duration) -> Option<LibraryEvent> {
        self.event_receiver.recv_timeout(timeout).ok()
    }
}

fn convert_event(event: &Event) -> Vec<LibraryEvent> {
    let mut out = Vec::new();
    for path in &event.paths {
        if !is_audio_file(path) {
            continue;
        }
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {
                out.push(LibraryEvent::FileChanged(path.clone()));
            }
            EventKind::Remove(_) => {
                out.push(LibraryEvent::FileRemoved(path.clone()));
            }
            _ => {}
        }
    }
    out
}
