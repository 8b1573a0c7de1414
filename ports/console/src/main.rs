// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


mod cli;
mod commands;
mod logger;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dockflow_core::memory::{MemoryRegistry, MemorySession, MemoryVolume};
use dockflow_core::{
    EngineConfig, JsonFilePreferenceStore, MediaSession, MediaSyncEngine, MemoryPreferenceStore,
    PlaybackSnapshot, PreferenceStore, SessionId, SessionMetadata, ThemeSelection,
};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::task::JoinHandle;

use crate::cli::Cli;
use crate::commands::{parse_command, ConsoleCommand, HELP};

struct Console {
    registry: Arc<MemoryRegistry>,
    volume: Arc<MemoryVolume>,
    engine: MediaSyncEngine,
    theme: ThemeSelection,
}

fn describe(snapshot: &PlaybackSnapshot) -> String {
    if !snapshot.is_active {
        return snapshot.title.clone();
    }
    let artwork = snapshot
        .artwork
        .as_ref()
        .map(|a| format!(" [art {}x{}]", a.width(), a.height()))
        .unwrap_or_default();
    format!(
        "{:?}: {} - {} ({}) {}/{}{}",
        snapshot.state,
        snapshot.title,
        snapshot.artist,
        snapshot.album,
        snapshot.formatted_position(),
        snapshot.formatted_duration(),
        artwork
    )
}

impl Console {
    fn session(&self, id: &str) -> Option<Arc<MemorySession>> {
        let session = self.registry.session(&SessionId::from(id));
        if session.is_none() {
            println!("No session named {}", id);
        }
        session
    }

    fn update_metadata(&self, id: &str, update: impl FnOnce(&mut SessionMetadata)) {
        if let Some(session) = self.session(id) {
            let mut metadata = session.metadata().unwrap_or_default();
            update(&mut metadata);
            session.set_metadata(Some(metadata));
        }
    }

    /// Returns `false` once the console should exit.
    async fn execute(&mut self, command: ConsoleCommand) -> bool {
        let controls = self.engine.controls().clone();
        let result = match command {
            ConsoleCommand::Add(id) => {
                if self.registry.session(&SessionId::from(id.as_str())).is_some() {
                    println!("Session {} already exists", id);
                } else {
                    self.registry.add_session(MemorySession::new(id));
                }
                Ok(())
            }
            ConsoleCommand::Remove(id) => {
                if self.registry.remove_session(&SessionId::from(id.as_str())).is_none() {
                    println!("No session named {}", id);
                }
                Ok(())
            }
            ConsoleCommand::State(id, state) => {
                if let Some(session) = self.session(&id) {
                    session.set_playback_state(state);
                }
                Ok(())
            }
            ConsoleCommand::Track { id, title, artist } => {
                if let Some(session) = self.session(&id) {
                    session.set_track(&title, &artist);
                }
                Ok(())
            }
            ConsoleCommand::Album(id, album) => {
                self.update_metadata(&id, |m| m.album = Some(album));
                Ok(())
            }
            ConsoleCommand::Duration(id, duration_ms) => {
                self.update_metadata(&id, |m| m.duration_ms = Some(duration_ms));
                Ok(())
            }
            ConsoleCommand::Position(id, position_ms) => {
                if let Some(session) = self.session(&id) {
                    session.set_position(Some(position_ms));
                }
                Ok(())
            }
            ConsoleCommand::Art(id, path) => {
                match std::fs::read(&path) {
                    Ok(bytes) => self.update_metadata(&id, |m| m.album_art = Some(Arc::from(bytes))),
                    Err(e) => println!("Cannot read {}: {}", path.display(), e),
                }
                Ok(())
            }
            ConsoleCommand::Toggle => controls.toggle_play_pause().await,
            ConsoleCommand::Next => controls.skip_next().await,
            ConsoleCommand::Previous => controls.skip_previous().await,
            ConsoleCommand::Seek(fraction) => controls.seek_to(fraction).await,
            ConsoleCommand::Deny => {
                self.registry.set_permission_denied(true);
                Ok(())
            }
            ConsoleCommand::Allow => {
                self.registry.set_permission_denied(false);
                Ok(())
            }
            ConsoleCommand::Volume(level) => {
                if let Some(level) = level {
                    self.volume.set_user_volume(level);
                }
                println!("Volume: {}", self.volume.volume());
                Ok(())
            }
            ConsoleCommand::Theme => {
                match self.theme.cycle() {
                    Ok(theme) => println!("Theme: {}", theme),
                    Err(e) => warn!("Theme not saved: {:#}", e),
                }
                Ok(())
            }
            ConsoleCommand::Show => {
                println!("{}", describe(&self.engine.current_snapshot()));
                println!("Theme: {}", self.theme.current());
                Ok(())
            }
            ConsoleCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            ConsoleCommand::Quit => return false,
        };
        if let Err(e) = result {
            println!("Command failed: {}", e);
        }
        true
    }
}

/// Wait for the snapshot printer; a panic or cancellation is logged, not propagated.
async fn join_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Snapshot printer ended abnormally: {}", e);
            false
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    logger::init_logger(args.log_file.as_deref(), args.log_level)?;

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let preferences: Arc<dyn PreferenceStore> = match &args.preferences {
        Some(path) => Arc::new(JsonFilePreferenceStore::open(path)),
        None => Arc::new(MemoryPreferenceStore::new()),
    };

    let registry = MemoryRegistry::new();
    let volume = MemoryVolume::new(args.volume);
    let engine = MediaSyncEngine::start(&config, registry.clone(), volume.clone());

    let mut snapshots = engine.subscribe();
    let printer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let line = describe(&snapshots.borrow_and_update());
            println!("> {}", line);
        }
    });

    let mut console = Console {
        registry,
        volume,
        engine,
        theme: ThemeSelection::load(preferences),
    };
    println!("Type 'help' for a list of commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(command) => {
                        if !console.execute(command).await {
                            break;
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    console.engine.stop().await;
    join_printer(printer).await;
    println!("Exiting...");
    Ok(())
}
