// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use clipgrid::audio::{list_output_devices, AudioSystem};
use clipgrid::config::EngineConfig;
use clipgrid::engine::{ControlClock, Engine, EngineCommand, EngineController};
use clipgrid::library::list_folder;
use clipgrid::sample::WavSampleProvider;

fn print_usage() {
    println!("CLIPGRID - Clip-Launch Audio Sequencer");
    println!();
    println!("Usage: clipgrid [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --list-audio              List available audio output devices");
    println!("  --list-samples <DIR> [SUB]  List the sample library at DIR (optionally a subfolder)");
    println!("  --demo <DIR> [SECONDS]    Launch the first column of samples from DIR (default 8s)");
    println!("  --config <FILE>           Use an engine configuration file with --demo");
    println!("  --help                    Show this help message");
}

fn list_audio() -> Result<()> {
    let devices = list_output_devices()?;
    if devices.is_empty() {
        println!("No audio output devices found");
        return Ok(());
    }
    println!("Audio output devices:");
    for (i, name) in devices.iter().enumerate() {
        println!("  {}: {}", i, name);
    }
    Ok(())
}

fn list_samples(dir: &str, subfolder: &str) -> Result<()> {
    let listing = list_folder(dir.as_ref(), subfolder)?;
    if subfolder.is_empty() {
        println!("Sample library at {}:", dir);
    } else {
        println!("Sample library at {}/{}:", dir, subfolder);
    }
    for folder in &listing.folders {
        println!("  [{}]", folder);
    }
    for file in &listing.files {
        println!("  {}", file.display());
    }
    println!();
    println!(
        "{} folder(s), {} file(s)",
        listing.folders.len(),
        listing.files.len()
    );
    Ok(())
}

fn run_demo(dir: &str, seconds: u64, config: EngineConfig) -> Result<()> {
    config.validate()?;

    let listing = list_folder(dir.as_ref(), "")?;
    let wavs: Vec<PathBuf> = listing
        .files
        .iter()
        .filter(|f| {
            f.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("wav"))
                .unwrap_or(false)
        })
        .take(config.rows)
        .cloned()
        .collect();

    if wavs.is_empty() {
        println!("No WAV files found in {}", dir);
        return Ok(());
    }

    let mut audio = AudioSystem::new();
    audio.start()?;

    let engine = Engine::new(&config, audio.mixer());
    let provider = WavSampleProvider::new(dir);
    let controller = EngineController::spawn(
        engine,
        ControlClock::Audio(audio.mixer()),
        Box::new(provider),
    );

    println!("Launching {} clip(s) at {} BPM...", wavs.len(), config.tempo);
    controller.send(EngineCommand::Start)?;
    for (row, path) in wavs.iter().enumerate() {
        println!("  ({}, 0) <- {}", row, path.display());
        controller.send(EngineCommand::AssignSample {
            row,
            col: 0,
            path: path.clone(),
        })?;
        controller.send(EngineCommand::Trigger { row, col: 0 })?;
    }

    thread::sleep(Duration::from_secs(seconds));

    println!("Stopping...");
    controller.send(EngineCommand::StopAll)?;
    thread::sleep(Duration::from_millis(200));
    controller.shutdown();
    audio.stop();

    println!("Demo complete!");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        println!("CLIPGRID - Clip-Launch Audio Sequencer");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[1].as_str() {
        "--list-audio" => {
            list_audio()?;
        }
        "--list-samples" => {
            if args.len() < 3 {
                eprintln!("Error: --list-samples requires a directory");
                std::process::exit(1);
            }
            let subfolder = args.get(3).map(String::as_str).unwrap_or("");
            list_samples(&args[2], subfolder)?;
        }
        "--demo" => {
            if args.len() < 3 {
                eprintln!("Error: --demo requires a sample directory");
                std::process::exit(1);
            }
            let seconds: u64 = args
                .get(3)
                .and_then(|s| s.parse().ok())
                .unwrap_or(8);
            let config = match args.iter().position(|a| a.as_str() == "--config") {
                Some(i) => {
                    let path = args.get(i + 1).ok_or_else(|| {
                        anyhow::anyhow!("--config requires a file path")
                    })?;
                    EngineConfig::load(path)?
                }
                None => EngineConfig::default(),
            };
            run_demo(&args[2], seconds, config)?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
