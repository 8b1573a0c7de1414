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

use tokio::sync::watch;

use crate::artwork::Artwork;
use crate::definitions::{PlaybackState, NO_MUSIC_TITLE, UNKNOWN_ARTIST};

/// Canonical "now playing" value. Never mutated once published; every update replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: Option<Artwork>,
    pub duration_ms: u64,
    /// Clamped to `duration_ms` whenever the duration is known.
    pub position_ms: u64,
    pub state: PlaybackState,
    /// True only when a real session is selected.
    pub is_active: bool,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self::inactive()
    }
}

impl PlaybackSnapshot {
    /// Placeholder shown while no session is selected.
    pub fn inactive() -> Self {
        Self {
            title: NO_MUSIC_TITLE.to_string(),
            artist: UNKNOWN_ARTIST.to_string(),
            album: String::new(),
            artwork: None,
            duration_ms: 0,
            position_ms: 0,
            state: PlaybackState::Stopped,
            is_active: false,
        }
    }

    /// Playback progress in `[0, 1]`; `0` while the duration is unknown.
    pub fn progress(&self) -> f32 {
        progress_fraction(self.position_ms, self.duration_ms)
    }

    pub fn formatted_position(&self) -> String {
        format_mm_ss(self.position_ms)
    }

    pub fn formatted_duration(&self) -> String {
        format_mm_ss(self.duration_ms)
    }
}

pub fn progress_fraction(position_ms: u64, duration_ms: u64) -> f32 {
    if duration_ms == 0 {
        return 0.0;
    }
    (position_ms as f64 / duration_ms as f64).clamp(0.0, 1.0) as f32
}

/// Inverse of [`progress_fraction`]: the position a seek bar fraction points at.
pub fn position_for_fraction(fraction: f32, duration_ms: u64) -> u64 {
    if !fraction.is_finite() {
        return 0;
    }
    (duration_ms as f64 * fraction.clamp(0.0, 1.0) as f64) as u64
}

/// `mm:ss`; minutes keep counting past an hour.
pub fn format_mm_ss(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub type SnapshotReceiver = watch::Receiver<PlaybackSnapshot>;

/// Single-writer publication point of the current snapshot.
///
/// Readers hold [`SnapshotReceiver`]s and always observe a complete snapshot; a publish swaps the
/// whole value and wakes them only when it differs from the previous one.
pub struct SnapshotPublisher {
    tx: watch::Sender<PlaybackSnapshot>,
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(PlaybackSnapshot::inactive());
        Self { tx }
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.tx.subscribe()
    }

    pub fn current(&self) -> PlaybackSnapshot {
        self.tx.borrow().clone()
    }

    /// Replace the current snapshot. Returns whether observers were notified.
    pub fn publish(&self, snapshot: PlaybackSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_at(position_ms: u64, duration_ms: u64) -> PlaybackSnapshot {
        PlaybackSnapshot { position_ms, duration_ms, ..PlaybackSnapshot::inactive() }
    }

    #[test]
    fn inactive_snapshot_uses_placeholders() {
        let snapshot = PlaybackSnapshot::inactive();
        assert_eq!(snapshot.title, "No music playing");
        assert_eq!(snapshot.artist, "Unknown Artist");
        assert_eq!(snapshot.album, "");
        assert_eq!(snapshot.state, PlaybackState::Stopped);
        assert!(!snapshot.is_active);
        assert_eq!(snapshot.progress(), 0.0);
    }

    #[test]
    fn progress_is_zero_without_duration() {
        assert_eq!(snapshot_at(5_000, 0).progress(), 0.0);
    }

    #[test]
    fn progress_is_monotonic_and_clamped() {
        let duration = 180_000;
        let mut previous = 0.0f32;
        for position in (0..=200_000).step_by(1_250) {
            let progress = progress_fraction(position, duration);
            assert!((0.0..=1.0).contains(&progress));
            assert!(progress >= previous);
            let back = position_for_fraction(progress, duration);
            assert!(back <= duration);
            previous = progress;
        }
        assert_eq!(progress_fraction(200_000, duration), 1.0);
    }

    #[test]
    fn position_for_fraction_clamps_and_rejects_nan() {
        assert_eq!(position_for_fraction(0.5, 200_000), 100_000);
        assert_eq!(position_for_fraction(1.5, 200_000), 200_000);
        assert_eq!(position_for_fraction(-0.2, 200_000), 0);
        assert_eq!(position_for_fraction(f32::NAN, 200_000), 0);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_mm_ss(0), "00:00");
        assert_eq!(format_mm_ss(61_999), "01:01");
        assert_eq!(format_mm_ss(3_725_000), "62:05");
        assert_eq!(snapshot_at(75_000, 200_000).formatted_position(), "01:15");
        assert_eq!(snapshot_at(75_000, 200_000).formatted_duration(), "03:20");
    }

    #[tokio::test]
    async fn publish_notifies_only_on_change() {
        let publisher = SnapshotPublisher::new();
        let mut rx = publisher.subscribe();

        assert!(!publisher.publish(PlaybackSnapshot::inactive()));
        assert!(!rx.has_changed().unwrap());

        let playing = PlaybackSnapshot {
            title: "So What".into(),
            state: PlaybackState::Playing,
            is_active: true,
            ..PlaybackSnapshot::inactive()
        };
        assert!(publisher.publish(playing.clone()));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), playing);
        assert_eq!(publisher.current(), playing);
    }
}
