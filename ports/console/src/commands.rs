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


//! Line commands that drive the in-memory registry and the engine controls.

use std::path::PathBuf;

use dockflow_core::NativePlaybackState;

pub const HELP: &str = "\
commands:
  add <id>                     register a session at the end of the list
  remove <id>                  drop a session
  state <id> <state>           playing | paused | stopped | buffering
  track <id> <title> | <artist>
  album <id> <album>
  duration <id> <seconds>
  position <id> <seconds>
  art <id> <image file>
  toggle | next | prev | seek <fraction>
  deny | allow                 revoke or grant monitoring permission
  volume [level]               show or change the device volume
  theme                        switch to the next theme
  show | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Add(String),
    Remove(String),
    State(String, NativePlaybackState),
    Track { id: String, title: String, artist: String },
    Album(String, String),
    Duration(String, u64),
    Position(String, u64),
    Art(String, PathBuf),
    Toggle,
    Next,
    Previous,
    Seek(f32),
    Deny,
    Allow,
    Volume(Option<u32>),
    Theme,
    Show,
    Help,
    Quit,
}

fn parse_state(value: &str) -> Result<NativePlaybackState, String> {
    match value.to_lowercase().as_str() {
        "playing" => Ok(NativePlaybackState::Playing),
        "paused" => Ok(NativePlaybackState::Paused),
        "stopped" => Ok(NativePlaybackState::Stopped),
        "buffering" => Ok(NativePlaybackState::Buffering),
        other => other
            .parse::<i32>()
            .map(NativePlaybackState::Other)
            .map_err(|_| format!("Invalid playback state: {}", value)),
    }
}

fn parse_seconds(value: &str) -> Result<u64, String> {
    value
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| (s * 1000.0) as u64)
        .ok_or_else(|| format!("Invalid number of seconds: {}", value))
}

/// Split `line` into the command word, the session id and the rest of the line.
fn split_args(line: &str) -> (&str, Option<&str>, &str) {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();
    if rest.is_empty() {
        return (word, None, "");
    }
    let (id, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    (word, Some(id), tail.trim())
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let (word, id, rest) = split_args(line);
    let need_id = || id.map(str::to_string).ok_or_else(|| format!("Missing session id for '{}'", word));
    let need_rest = || {
        if rest.is_empty() {
            Err(format!("Missing argument for '{}'", word))
        } else {
            Ok(rest)
        }
    };

    let command = match word.to_lowercase().as_str() {
        "add" => ConsoleCommand::Add(need_id()?),
        "remove" => ConsoleCommand::Remove(need_id()?),
        "state" => ConsoleCommand::State(need_id()?, parse_state(need_rest()?)?),
        "track" => {
            let id = need_id()?;
            let (title, artist) = need_rest()?.split_once('|').unwrap_or((rest, ""));
            ConsoleCommand::Track { id, title: title.trim().to_string(), artist: artist.trim().to_string() }
        }
        "album" => ConsoleCommand::Album(need_id()?, need_rest()?.to_string()),
        "duration" => ConsoleCommand::Duration(need_id()?, parse_seconds(need_rest()?)?),
        "position" => ConsoleCommand::Position(need_id()?, parse_seconds(need_rest()?)?),
        "art" => ConsoleCommand::Art(need_id()?, PathBuf::from(need_rest()?)),
        "toggle" => ConsoleCommand::Toggle,
        "next" => ConsoleCommand::Next,
        "prev" | "previous" => ConsoleCommand::Previous,
        "seek" => {
            let value = id.ok_or_else(|| "Missing seek fraction".to_string())?;
            let fraction = value.parse::<f32>().map_err(|_| format!("Invalid seek fraction: {}", value))?;
            ConsoleCommand::Seek(fraction)
        }
        "deny" => ConsoleCommand::Deny,
        "allow" => ConsoleCommand::Allow,
        "volume" => match id {
            Some(value) => ConsoleCommand::Volume(Some(
                value.parse().map_err(|_| format!("Invalid volume: {}", value))?,
            )),
            None => ConsoleCommand::Volume(None),
        },
        "theme" => ConsoleCommand::Theme,
        "show" => ConsoleCommand::Show,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        "" => return Err("Empty command".to_string()),
        other => return Err(format!("Unknown command: {}", other)),
    };
    Ok(command)
}
