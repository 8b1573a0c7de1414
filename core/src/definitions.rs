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

use std::time::Duration;

/// Title shown when no session is selected.
pub const NO_MUSIC_TITLE: &str = "No music playing";
/// Title used when a selected session does not report one.
pub const UNKNOWN_TRACK_TITLE: &str = "Unknown Track";
/// Artist used both for the idle placeholder and for sessions without an artist.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Backstop poll interval of the scheduler.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
/// Lower bound for a configured poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Preference key under which the selected theme is stored.
pub const THEME_PREFERENCE_KEY: &str = "selected_theme";

/// Represents the playback states exposed to the presentation layer.
///
/// Platform sessions report a richer set of states (connecting, skipping, error, ...). Everything
/// that is not explicitly playing, paused or buffering collapses into [`PlaybackState::Stopped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Audio is being produced.
    Playing,
    /// Playback is halted but can be resumed at the same position.
    Paused,
    /// Nothing is playing, or the session reported a state the dock does not distinguish.
    #[default]
    Stopped,
    /// Playback is momentarily halted due to data loading or network conditions.
    Buffering,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}
