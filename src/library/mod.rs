// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sample library listing.
//!
//! Hierarchical folder/file listing over the sample root. Folders are
//! returned by name, files as paths relative to the root so they can be
//! handed straight to the sample provider and stored in presets.

pub mod watcher;

pub use watcher::{LibraryEvent, LibraryWatcher};

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

/// File extensions offered in the browser
pub const AUDIO_EXTENSIONS: [&str; 5] = ["wav", "mp3", "ogg", "flac", "m4a"];

/// One level of the sample library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderListing {
    /// Subfolder names, sorted
    pub folders: Vec<String>,
    /// Audio file paths relative to the library root, sorted
    pub files: Vec<PathBuf>,
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// List one folder of the library.
///
/// `subfolder` is a path relative to `root`; an empty string lists the
/// root itself. Paths that try to escape the root are rejected.
pub fn list_folder(root: &Path, subfolder: &str) -> Result<FolderListing> {
    let relative = Path::new(subfolder);
    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        bail!("invalid library path: {:?}", subfolder);
    }

    let full = root.join(relative);
    let entries = std::fs::read_dir(&full)
        .with_context(|| format!("Failed to list sample folder: {:?}", full))?;

    let mut listing = FolderListing::default();
    for entry in entries {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if file_type.is_dir() {
            listing.folders.push(name);
        } else if file_type.is_file() && is_audio_file(&entry.path()) {
            listing.files.push(relative.join(name));
        }
    }

    listing.folders.sort();
    listing.files.sort();
    Ok(listing)
}
