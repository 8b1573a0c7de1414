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

//! In-process implementations of the platform interfaces.
//!
//! They back the console port and the test suites: sessions, the registry and the volume control
//! are plain state behind mutexes, and every mutation fires the registered refresh triggers the
//! way a platform callback would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::registry::{PermissionState, RegistryError, SessionRegistry, SubscriptionId};
use crate::session::{MediaSession, NativePlaybackState, Session, SessionError, SessionId, SessionMetadata};
use crate::trigger::RefreshTrigger;
use crate::volume::{DeviceError, VolumeControl};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transport command received by a [`MemorySession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    SkipNext,
    SkipPrevious,
    SeekTo(u64),
}

#[derive(Default)]
struct SessionFields {
    playback_state: NativePlaybackState,
    metadata: Option<SessionMetadata>,
    position_ms: Option<u64>,
}

pub struct MemorySession {
    id: SessionId,
    fields: Mutex<SessionFields>,
    listeners: Mutex<HashMap<SubscriptionId, RefreshTrigger>>,
    commands: Mutex<Vec<TransportCommand>>,
}

impl MemorySession {
    pub fn new(id: impl Into<SessionId>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            fields: Mutex::new(SessionFields::default()),
            listeners: Mutex::new(HashMap::new()),
            commands: Mutex::new(Vec::new()),
        })
    }

    pub fn set_playback_state(&self, state: NativePlaybackState) {
        lock(&self.fields).playback_state = state;
        self.notify_listeners();
    }

    pub fn set_metadata(&self, metadata: Option<SessionMetadata>) {
        lock(&self.fields).metadata = metadata;
        self.notify_listeners();
    }

    /// Replace title and artist, keeping the rest of the metadata.
    pub fn set_track(&self, title: &str, artist: &str) {
        {
            let mut fields = lock(&self.fields);
            let metadata = fields.metadata.get_or_insert_with(SessionMetadata::default);
            metadata.title = Some(title.to_string());
            metadata.artist = Some(artist.to_string());
        }
        self.notify_listeners();
    }

    pub fn set_position(&self, position_ms: Option<u64>) {
        lock(&self.fields).position_ms = position_ms;
        self.notify_listeners();
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    pub fn commands(&self) -> Vec<TransportCommand> {
        lock(&self.commands).clone()
    }

    fn add_listener(&self, subscription: SubscriptionId, trigger: RefreshTrigger) {
        lock(&self.listeners).insert(subscription, trigger);
    }

    fn remove_listener(&self, subscription: SubscriptionId) -> bool {
        lock(&self.listeners).remove(&subscription).is_some()
    }

    fn notify_listeners(&self) {
        let triggers: Vec<RefreshTrigger> = lock(&self.listeners).values().cloned().collect();
        for trigger in triggers {
            trigger.fire();
        }
    }

    fn record(&self, command: TransportCommand) -> Result<(), SessionError> {
        lock(&self.commands).push(command);
        Ok(())
    }
}

#[async_trait]
impl MediaSession for MemorySession {
    fn id(&self) -> SessionId {
        self.id.clone()
    }

    fn playback_state(&self) -> NativePlaybackState {
        lock(&self.fields).playback_state
    }

    fn metadata(&self) -> Option<SessionMetadata> {
        lock(&self.fields).metadata.clone()
    }

    fn position_ms(&self) -> Option<u64> {
        lock(&self.fields).position_ms
    }

    async fn play(&self) -> Result<(), SessionError> {
        self.record(TransportCommand::Play)?;
        self.set_playback_state(NativePlaybackState::Playing);
        Ok(())
    }

    async fn pause(&self) -> Result<(), SessionError> {
        self.record(TransportCommand::Pause)?;
        self.set_playback_state(NativePlaybackState::Paused);
        Ok(())
    }

    async fn skip_next(&self) -> Result<(), SessionError> {
        self.record(TransportCommand::SkipNext)
    }

    async fn skip_previous(&self) -> Result<(), SessionError> {
        self.record(TransportCommand::SkipPrevious)
    }

    async fn seek_to(&self, position_ms: u64) -> Result<(), SessionError> {
        self.record(TransportCommand::SeekTo(position_ms))?;
        self.set_position(Some(position_ms));
        Ok(())
    }
}

/// Session registry holding an ordered list of [`MemorySession`]s.
#[derive(Default)]
pub struct MemoryRegistry {
    sessions: Mutex<Vec<Arc<MemorySession>>>,
    list_listeners: Mutex<HashMap<SubscriptionId, RefreshTrigger>>,
    session_subscriptions: Mutex<HashMap<SubscriptionId, Arc<MemorySession>>>,
    next_subscription: AtomicU64,
    permission_denied: AtomicBool,
    subscribe_calls: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Append a session at the end of the registry order.
    pub fn add_session(&self, session: Arc<MemorySession>) {
        lock(&self.sessions).push(session);
        self.notify_list_changed();
    }

    pub fn remove_session(&self, id: &SessionId) -> Option<Arc<MemorySession>> {
        let removed = {
            let mut sessions = lock(&self.sessions);
            let index = sessions.iter().position(|s| s.id == *id)?;
            sessions.remove(index)
        };
        self.notify_list_changed();
        Some(removed)
    }

    pub fn session(&self, id: &SessionId) -> Option<Arc<MemorySession>> {
        lock(&self.sessions).iter().find(|s| s.id == *id).cloned()
    }

    pub fn set_permission_denied(&self, denied: bool) {
        self.permission_denied.store(denied, Ordering::SeqCst);
        self.notify_list_changed();
    }

    /// Number of listeners still registered, session and session-list ones together.
    pub fn active_subscriptions(&self) -> usize {
        lock(&self.list_listeners).len() + lock(&self.session_subscriptions).len()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    fn next_subscription_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn notify_list_changed(&self) {
        let triggers: Vec<RefreshTrigger> = lock(&self.list_listeners).values().cloned().collect();
        for trigger in triggers {
            trigger.fire();
        }
    }
}

#[async_trait]
impl SessionRegistry for MemoryRegistry {
    async fn list_active_sessions(&self) -> Result<Vec<Session>, RegistryError> {
        if self.permission_denied.load(Ordering::SeqCst) {
            return Err(RegistryError::PermissionDenied);
        }
        Ok(lock(&self.sessions).iter().cloned().map(Session::from).collect())
    }

    async fn subscribe(
        &self,
        session: &Session,
        trigger: RefreshTrigger,
    ) -> Result<SubscriptionId, RegistryError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let id = session.id();
        let memory_session = self.session(&id).ok_or(RegistryError::SessionGone(id))?;
        let subscription = self.next_subscription_id();
        memory_session.add_listener(subscription, trigger);
        lock(&self.session_subscriptions).insert(subscription, memory_session);
        Ok(subscription)
    }

    async fn subscribe_session_list(
        &self,
        trigger: RefreshTrigger,
    ) -> Result<SubscriptionId, RegistryError> {
        let subscription = self.next_subscription_id();
        lock(&self.list_listeners).insert(subscription, trigger);
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) {
        if lock(&self.list_listeners).remove(&subscription).is_some() {
            return;
        }
        if let Some(session) = lock(&self.session_subscriptions).remove(&subscription) {
            session.remove_listener(subscription);
        }
    }
}

impl PermissionState for MemoryRegistry {
    fn is_monitoring_permission_granted(&self) -> bool {
        !self.permission_denied.load(Ordering::SeqCst)
    }
}

/// Volume control that records every device call and can be told to fail.
pub struct MemoryVolume {
    volume: Mutex<u32>,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    get_calls: AtomicUsize,
    set_calls: Mutex<Vec<u32>>,
}

impl MemoryVolume {
    pub fn new(volume: u32) -> Arc<Self> {
        Arc::new(Self {
            volume: Mutex::new(volume),
            fail_get: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            get_calls: AtomicUsize::new(0),
            set_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn volume(&self) -> u32 {
        *lock(&self.volume)
    }

    /// Change the volume as the user would, without recording a device call.
    pub fn set_user_volume(&self, volume: u32) {
        *lock(&self.volume) = volume;
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Values passed to successful `set_volume` calls, in order.
    pub fn set_calls(&self) -> Vec<u32> {
        lock(&self.set_calls).clone()
    }
}

#[async_trait]
impl VolumeControl for MemoryVolume {
    async fn get_volume(&self) -> Result<u32, DeviceError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(DeviceError("volume query rejected".into()));
        }
        Ok(self.volume())
    }

    async fn set_volume(&self, volume: u32) -> Result<(), DeviceError> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(DeviceError("volume change rejected".into()));
        }
        *lock(&self.volume) = volume;
        lock(&self.set_calls).push(volume);
        Ok(())
    }
}
