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

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use log::{debug, warn};

use crate::ad_suppression::AdSuppressor;
use crate::artwork::{decode_artwork, Artwork, ArtworkLimits};
use crate::definitions::{PlaybackState, UNKNOWN_ARTIST, UNKNOWN_TRACK_TITLE};
use crate::session::Session;
use crate::snapshot::{PlaybackSnapshot, SnapshotPublisher};

fn hash_bytes(data: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

/// Last decoded artwork. Failures are cached too so a broken image is reported once rather than
/// on every poll.
///
/// The encoded buffer is kept alive so a pointer match identifies the same payload; a content
/// hash catches equal payloads handed over in a new buffer.
struct ArtworkCache {
    bytes: Arc<[u8]>,
    hash: u64,
    artwork: Option<Artwork>,
}

impl ArtworkCache {
    fn lookup(&self, bytes: &Arc<[u8]>) -> Option<Option<Artwork>> {
        if Arc::ptr_eq(&self.bytes, bytes) {
            return Some(self.artwork.clone());
        }
        if self.bytes.len() == bytes.len() && self.hash == hash_bytes(bytes) {
            return Some(self.artwork.clone());
        }
        None
    }
}

/// Turns the selected session into the published [`PlaybackSnapshot`].
pub struct MetadataReconciler {
    limits: ArtworkLimits,
    artwork_cache: Option<ArtworkCache>,
    suppressor: AdSuppressor,
    publisher: SnapshotPublisher,
}

impl MetadataReconciler {
    pub fn new(limits: ArtworkLimits, suppressor: AdSuppressor, publisher: SnapshotPublisher) -> Self {
        Self { limits, artwork_cache: None, suppressor, publisher }
    }

    pub fn publisher(&self) -> &SnapshotPublisher {
        &self.publisher
    }

    pub fn suppressor(&self) -> &AdSuppressor {
        &self.suppressor
    }

    /// Build a snapshot for `session`, run ad suppression on it and publish it.
    ///
    /// Ad suppression runs before publication and only for real sessions; the idle placeholder
    /// is never classified.
    pub async fn reconcile(&mut self, session: Option<&Session>) -> PlaybackSnapshot {
        let snapshot = self.snapshot_for(session).await;
        if snapshot.is_active {
            self.suppressor.on_track(&snapshot.title, &snapshot.artist).await;
        }
        if self.publisher.publish(snapshot.clone()) {
            debug!("Published snapshot: {:?} - {:?} ({:?})", snapshot.title, snapshot.artist, snapshot.state);
        }
        snapshot
    }

    /// Builds the snapshot without running ad suppression or publishing it.
    pub async fn snapshot_for(&mut self, session: Option<&Session>) -> PlaybackSnapshot {
        let Some(session) = session else {
            self.artwork_cache = None;
            return PlaybackSnapshot::inactive();
        };

        let metadata = session.metadata().unwrap_or_default();
        let duration_ms = metadata.duration_ms.unwrap_or(0);
        let position_ms = session.position_ms().unwrap_or(0);
        let position_ms = if duration_ms > 0 { position_ms.min(duration_ms) } else { position_ms };
        let artwork = match metadata.artwork_bytes() {
            Some(bytes) => self.artwork_for(bytes).await,
            None => {
                self.artwork_cache = None;
                None
            }
        };

        PlaybackSnapshot {
            title: metadata.title.unwrap_or_else(|| UNKNOWN_TRACK_TITLE.to_string()),
            artist: metadata.artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: metadata.album.unwrap_or_default(),
            artwork,
            duration_ms,
            position_ms,
            state: PlaybackState::from(session.playback_state()),
            is_active: true,
        }
    }

    async fn artwork_for(&mut self, bytes: &Arc<[u8]>) -> Option<Artwork> {
        if let Some(artwork) = self.artwork_cache.as_ref().and_then(|c| c.lookup(bytes)) {
            return artwork;
        }
        let limits = self.limits;
        let encoded = bytes.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            (hash_bytes(&encoded), decode_artwork(&encoded, limits))
        })
        .await;
        let (hash, artwork) = match decoded {
            Ok((hash, Ok(artwork))) => (hash, Some(artwork)),
            Ok((hash, Err(e))) => {
                warn!("Dropping artwork: {}", e);
                (hash, None)
            }
            Err(e) => {
                warn!("Artwork decode task failed: {}", e);
                return None;
            }
        };
        self.artwork_cache = Some(ArtworkCache { bytes: bytes.clone(), hash, artwork: artwork.clone() });
        artwork
    }

    /// Restore the volume if an ad episode is still open.
    pub async fn shutdown(&mut self) {
        self.suppressor.restore().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ad_suppression::{AdClassifier, MuteState};
    use crate::artwork::tests::encode_png;
    use crate::memory::{MemorySession, MemoryVolume};
    use crate::session::{NativePlaybackState, SessionMetadata};

    fn reconciler(volume: &Arc<MemoryVolume>) -> MetadataReconciler {
        MetadataReconciler::new(
            ArtworkLimits::default(),
            AdSuppressor::new(AdClassifier::default(), volume.clone()),
            SnapshotPublisher::new(),
        )
    }

    fn track(title: &str, artist: &str) -> Arc<MemorySession> {
        let session = MemorySession::new("player");
        session.set_playback_state(NativePlaybackState::Playing);
        session.set_track(title, artist);
        session
    }

    #[tokio::test]
    async fn no_session_publishes_placeholder_without_touching_volume() {
        let volume = MemoryVolume::new(7);
        let mut reconciler = reconciler(&volume);

        let snapshot = reconciler.reconcile(None).await;
        assert_eq!(snapshot, PlaybackSnapshot::inactive());
        assert_eq!(snapshot.title, "No music playing");
        assert_eq!(snapshot.state, PlaybackState::Stopped);
        assert!(!snapshot.is_active);
        assert_eq!(volume.get_calls(), 0);
        assert!(volume.set_calls().is_empty());
    }

    #[tokio::test]
    async fn missing_fields_fall_back_to_defaults() {
        let volume = MemoryVolume::new(7);
        let mut reconciler = reconciler(&volume);
        let session = MemorySession::new("bare");
        session.set_playback_state(NativePlaybackState::Other(8));

        let snapshot = reconciler.reconcile(Some(&Session::from(session))).await;
        assert_eq!(snapshot.title, "Unknown Track");
        assert_eq!(snapshot.artist, "Unknown Artist");
        assert_eq!(snapshot.album, "");
        assert_eq!(snapshot.duration_ms, 0);
        assert_eq!(snapshot.position_ms, 0);
        assert_eq!(snapshot.state, PlaybackState::Stopped);
        assert!(snapshot.artwork.is_none());
        assert!(snapshot.is_active);
    }

    #[tokio::test]
    async fn position_is_clamped_to_duration() {
        let volume = MemoryVolume::new(7);
        let mut reconciler = reconciler(&volume);
        let session = track("So What", "Miles Davis");
        session.set_metadata(Some(SessionMetadata {
            title: Some("So What".into()),
            duration_ms: Some(60_000),
            ..Default::default()
        }));
        session.set_position(Some(90_000));

        let snapshot = reconciler.reconcile(Some(&Session::from(session))).await;
        assert_eq!(snapshot.position_ms, 60_000);
        assert_eq!(snapshot.progress(), 1.0);
    }

    #[tokio::test]
    async fn reconciling_unchanged_session_is_idempotent() {
        let volume = MemoryVolume::new(7);
        let mut reconciler = reconciler(&volume);
        let session = track("So What", "Miles Davis");
        session.set_metadata(Some(SessionMetadata {
            title: Some("So What".into()),
            artist: Some("Miles Davis".into()),
            album: Some("Kind of Blue".into()),
            duration_ms: Some(545_000),
            album_art: Some(Arc::from(encode_png(2, 2, [5, 6, 7, 255]))),
            art: None,
        }));
        session.set_position(Some(12_000));
        let session = Session::from(session);

        let first = reconciler.reconcile(Some(&session)).await;
        let second = reconciler.reconcile(Some(&session)).await;
        assert_eq!(first, second);
        assert!(first.artwork.is_some());
    }

    #[tokio::test]
    async fn corrupt_artwork_keeps_text_fields() {
        let volume = MemoryVolume::new(7);
        let mut reconciler = reconciler(&volume);
        let session = track("So What", "Miles Davis");
        session.set_metadata(Some(SessionMetadata {
            title: Some("So What".into()),
            artist: Some("Miles Davis".into()),
            album_art: Some(Arc::from(vec![0u8, 1, 2, 3])),
            art: Some(Arc::from(encode_png(1, 1, [0, 0, 0, 255]))),
            ..Default::default()
        }));

        let snapshot = reconciler.reconcile(Some(&Session::from(session))).await;
        assert_eq!(snapshot.title, "So What");
        assert_eq!(snapshot.artist, "Miles Davis");
        assert!(snapshot.artwork.is_none());
    }

    #[tokio::test]
    async fn ad_track_mutes_before_publishing() {
        let volume = MemoryVolume::new(7);
        let mut reconciler = reconciler(&volume);
        let mut rx = reconciler.publisher().subscribe();

        let ad = Session::from(track("Sponsored content", "Unknown"));
        reconciler.reconcile(Some(&ad)).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().title, "Sponsored content");
        assert_eq!(volume.volume(), 0);
        assert_eq!(reconciler.suppressor().state(), MuteState::Muted { saved_volume: 7 });

        let song = Session::from(track("So What", "Miles Davis"));
        reconciler.reconcile(Some(&song)).await;
        assert_eq!(volume.volume(), 7);
        assert_eq!(reconciler.suppressor().state(), MuteState::Unmuted);
    }

    #[tokio::test]
    async fn shutdown_restores_muted_volume() {
        let volume = MemoryVolume::new(5);
        let mut reconciler = reconciler(&volume);
        reconciler.reconcile(Some(&Session::from(track("Advertisement", "")))).await;
        assert_eq!(volume.volume(), 0);

        reconciler.shutdown().await;
        assert_eq!(volume.volume(), 5);
    }

    #[tokio::test]
    async fn artwork_is_decoded_once_per_payload() {
        let volume = MemoryVolume::new(7);
        let mut reconciler = reconciler(&volume);
        let png: Arc<[u8]> = Arc::from(encode_png(3, 2, [9, 9, 9, 255]));
        let session = track("So What", "Miles Davis");
        session.set_metadata(Some(SessionMetadata { album_art: Some(png.clone()), ..Default::default() }));
        let session = Session::from(session);

        let first = reconciler.snapshot_for(Some(&session)).await.artwork.unwrap();
        let second = reconciler.snapshot_for(Some(&session)).await.artwork.unwrap();
        assert_eq!((first.width(), first.height()), (3, 2));
        assert!(std::ptr::eq(first.image(), second.image()));

        // same payload in a fresh buffer still hits the cache
        let copy: Arc<[u8]> = Arc::from(png.to_vec());
        let copied = track("So What", "Miles Davis");
        copied.set_metadata(Some(SessionMetadata { album_art: Some(copy), ..Default::default() }));
        let third = reconciler.snapshot_for(Some(&Session::from(copied))).await.artwork.unwrap();
        assert!(std::ptr::eq(first.image(), third.image()));

        // a different payload is decoded again
        let other = track("So What", "Miles Davis");
        other.set_metadata(Some(SessionMetadata {
            album_art: Some(Arc::from(encode_png(1, 1, [0, 0, 0, 255]))),
            ..Default::default()
        }));
        let fourth = reconciler.snapshot_for(Some(&Session::from(other))).await.artwork.unwrap();
        assert_eq!((fourth.width(), fourth.height()), (1, 1));
    }
}
