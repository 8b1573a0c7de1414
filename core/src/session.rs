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

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::definitions::PlaybackState;

/// Stable identity of a platform media session, used to diff selections between passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Playback state as reported by the platform, before it is folded into [`PlaybackState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NativePlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
    Buffering,
    /// Any other platform state (connecting, skipping, error, ...), carrying the raw code.
    Other(i32),
}

impl From<NativePlaybackState> for PlaybackState {
    fn from(state: NativePlaybackState) -> Self {
        match state {
            NativePlaybackState::Playing => PlaybackState::Playing,
            NativePlaybackState::Paused => PlaybackState::Paused,
            NativePlaybackState::Buffering => PlaybackState::Buffering,
            NativePlaybackState::Stopped | NativePlaybackState::Other(_) => PlaybackState::Stopped,
        }
    }
}

/// Raw metadata bundle of a session. Every field is optional; absence is routine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_ms: Option<u64>,
    /// Encoded album art, preferred over [`SessionMetadata::art`].
    pub album_art: Option<Arc<[u8]>>,
    /// Encoded generic art.
    pub art: Option<Arc<[u8]>>,
}

impl SessionMetadata {
    /// Encoded artwork following the album art → generic art fallback chain.
    pub fn artwork_bytes(&self) -> Option<&Arc<[u8]>> {
        self.album_art.as_ref().or(self.art.as_ref())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Feature not supported")]
    NotSupported,
    #[error("Session is no longer available")]
    Gone,
    #[error("Platform error: {0}")]
    Platform(String),
}

/// A single app's claim to media playback, as exposed by the platform.
///
/// Getters return values the platform already holds for the session, so they are cheap and
/// synchronous. Transport controls are asynchronous and unsupported unless implemented.
#[async_trait]
pub trait MediaSession: Send + Sync {
    fn id(&self) -> SessionId;

    fn playback_state(&self) -> NativePlaybackState;

    fn metadata(&self) -> Option<SessionMetadata>;

    fn position_ms(&self) -> Option<u64>;

    async fn play(&self) -> Result<(), SessionError> {
        Err(SessionError::NotSupported)
    }
    async fn pause(&self) -> Result<(), SessionError> {
        Err(SessionError::NotSupported)
    }
    async fn skip_next(&self) -> Result<(), SessionError> {
        Err(SessionError::NotSupported)
    }
    async fn skip_previous(&self) -> Result<(), SessionError> {
        Err(SessionError::NotSupported)
    }
    async fn seek_to(&self, _position_ms: u64) -> Result<(), SessionError> {
        Err(SessionError::NotSupported)
    }
}

/// Shared, cheaply cloneable reference to a platform session.
///
/// The engine never owns the lifecycle of the underlying session; it can disappear at any time
/// and subsequent calls are expected to fail or return stale data.
#[derive(Clone)]
pub struct Session {
    session_impl: Arc<dyn MediaSession>,
}

impl Session {
    pub fn new(session_impl: Arc<dyn MediaSession>) -> Self {
        Self { session_impl }
    }

    pub fn id(&self) -> SessionId {
        self.session_impl.id()
    }

    pub fn is_same_session(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.session_impl, &other.session_impl) || self.id() == other.id()
    }

    pub fn playback_state(&self) -> NativePlaybackState {
        self.session_impl.playback_state()
    }

    pub fn metadata(&self) -> Option<SessionMetadata> {
        self.session_impl.metadata()
    }

    pub fn position_ms(&self) -> Option<u64> {
        self.session_impl.position_ms()
    }

    pub async fn play(&self) -> Result<(), SessionError> {
        self.session_impl.play().await
    }
    pub async fn pause(&self) -> Result<(), SessionError> {
        self.session_impl.pause().await
    }
    pub async fn skip_next(&self) -> Result<(), SessionError> {
        self.session_impl.skip_next().await
    }
    pub async fn skip_previous(&self) -> Result<(), SessionError> {
        self.session_impl.skip_previous().await
    }
    pub async fn seek_to(&self, position_ms: u64) -> Result<(), SessionError> {
        self.session_impl.seek_to(position_ms).await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("playback_state", &self.playback_state())
            .finish()
    }
}

impl<T: MediaSession + 'static> From<Arc<T>> for Session {
    fn from(session_impl: Arc<T>) -> Self {
        Session::new(session_impl)
    }
}
