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

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error, info, warn};

use crate::registry::{RegistryError, SessionRegistry, SubscriptionId};
use crate::session::{NativePlaybackState, Session};
use crate::trigger::RefreshTrigger;

/// Pick the foreground session: the first one playing, else the first one listed.
pub fn select(sessions: &[Session]) -> Option<Session> {
    sessions
        .iter()
        .find(|s| s.playback_state() == NativePlaybackState::Playing)
        .or_else(|| sessions.first())
        .cloned()
}

/// Read side of the current selection, shared with transport controls.
#[derive(Clone, Default, Debug)]
pub struct SelectedSession {
    inner: Arc<Mutex<Option<Session>>>,
}

impl SelectedSession {
    pub fn get(&self) -> Option<Session> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn set(&self, session: Option<Session>) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

struct Subscribed {
    session: Session,
    subscription: Option<SubscriptionId>,
}

/// Keeps exactly one change listener attached: to the currently selected session.
pub struct ActiveSessionSelector {
    registry: Arc<dyn SessionRegistry>,
    trigger: RefreshTrigger,
    current: Option<Subscribed>,
    selected: SelectedSession,
}

impl ActiveSessionSelector {
    pub fn new(registry: Arc<dyn SessionRegistry>, trigger: RefreshTrigger) -> Self {
        Self { registry, trigger, current: None, selected: SelectedSession::default() }
    }

    pub fn selected(&self) -> SelectedSession {
        self.selected.clone()
    }

    /// Query the registry, select a session and move the change listener if the selection moved.
    pub async fn refresh(&mut self) -> Option<Session> {
        let sessions = self.list_sessions().await;
        let next = select(&sessions);

        let unchanged = match (&self.current, &next) {
            (Some(current), Some(next)) => current.session.is_same_session(next),
            (None, None) => true,
            _ => false,
        };

        if unchanged {
            if let Some(next) = next {
                let missing_listener = self.current.as_ref().is_some_and(|c| c.subscription.is_none());
                let subscription = if missing_listener { self.subscribe_to(&next).await } else { None };
                if let Some(current) = self.current.as_mut() {
                    // registry may hand out a fresh handle for the same session
                    current.session = next;
                    if subscription.is_some() {
                        debug!("Listener attached to session {} on retry", current.session.id());
                        current.subscription = subscription;
                    }
                    self.selected.set(Some(current.session.clone()));
                }
            }
        } else {
            self.switch_to(next).await;
        }

        self.current.as_ref().map(|c| c.session.clone())
    }

    /// Detach the listener from the selected session and forget it.
    pub async fn release(&mut self) {
        self.switch_to(None).await;
    }

    async fn list_sessions(&self) -> Vec<Session> {
        match self.registry.list_active_sessions().await {
            Ok(sessions) => sessions,
            Err(RegistryError::PermissionDenied) => {
                warn!("Media session access denied, treating session list as empty");
                Vec::new()
            }
            Err(e) => {
                error!("Failed to list media sessions: {}", e);
                Vec::new()
            }
        }
    }

    /// Attach the change listener to `session`. On failure polling covers the session and the
    /// next pass retries.
    async fn subscribe_to(&self, session: &Session) -> Option<SubscriptionId> {
        match self.registry.subscribe(session, self.trigger.clone()).await {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!("Failed to subscribe to session {}, relying on polling: {}", session.id(), e);
                None
            }
        }
    }

    async fn switch_to(&mut self, next: Option<Session>) {
        if let Some(previous) = self.current.take() {
            if let Some(subscription) = previous.subscription {
                self.registry.unsubscribe(subscription).await;
            }
            debug!("Released session {}", previous.session.id());
        }

        self.current = match next {
            Some(session) => {
                let subscription = self.subscribe_to(&session).await;
                info!("Selected session {}", session.id());
                Some(Subscribed { session, subscription })
            }
            None => None,
        };
        self.selected.set(self.current.as_ref().map(|c| c.session.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::memory::{MemoryRegistry, MemorySession};

    /// Memory registry whose calls can be made to fail.
    struct UnreliableRegistry {
        inner: Arc<MemoryRegistry>,
        failing_subscribes: AtomicUsize,
        list_fails: AtomicBool,
    }

    impl UnreliableRegistry {
        fn new(inner: Arc<MemoryRegistry>) -> Arc<Self> {
            Arc::new(Self { inner, failing_subscribes: AtomicUsize::new(0), list_fails: AtomicBool::new(false) })
        }
    }

    #[async_trait]
    impl SessionRegistry for UnreliableRegistry {
        async fn list_active_sessions(&self) -> Result<Vec<Session>, RegistryError> {
            if self.list_fails.load(Ordering::SeqCst) {
                return Err(RegistryError::Platform("session manager unavailable".into()));
            }
            self.inner.list_active_sessions().await
        }

        async fn subscribe(
            &self,
            session: &Session,
            trigger: RefreshTrigger,
        ) -> Result<SubscriptionId, RegistryError> {
            let failing = self.failing_subscribes.load(Ordering::SeqCst);
            if failing > 0 {
                self.failing_subscribes.store(failing - 1, Ordering::SeqCst);
                return Err(RegistryError::Platform("listener rejected".into()));
            }
            self.inner.subscribe(session, trigger).await
        }

        async fn subscribe_session_list(
            &self,
            trigger: RefreshTrigger,
        ) -> Result<SubscriptionId, RegistryError> {
            self.inner.subscribe_session_list(trigger).await
        }

        async fn unsubscribe(&self, subscription: SubscriptionId) {
            self.inner.unsubscribe(subscription).await
        }
    }

    fn sessions(states: &[NativePlaybackState]) -> Vec<Session> {
        states
            .iter()
            .enumerate()
            .map(|(i, state)| {
                let session = MemorySession::new(format!("s{i}"));
                session.set_playback_state(*state);
                Session::from(session)
            })
            .collect()
    }

    fn selected_id(sessions: &[Session]) -> Option<String> {
        select(sessions).map(|s| s.id().to_string())
    }

    #[test]
    fn single_playing_session_wins_wherever_it_is() {
        use NativePlaybackState::*;
        for position in 0..4 {
            let mut states = vec![Paused, Stopped, Other(3), Buffering];
            states[position] = Playing;
            assert_eq!(selected_id(&sessions(&states)), Some(format!("s{position}")));
        }
    }

    #[test]
    fn first_playing_session_wins_ties() {
        use NativePlaybackState::*;
        assert_eq!(selected_id(&sessions(&[Paused, Playing, Playing])), Some("s1".into()));
    }

    #[test]
    fn falls_back_to_first_session_when_nothing_plays() {
        use NativePlaybackState::*;
        assert_eq!(selected_id(&sessions(&[Paused, Buffering, Stopped])), Some("s0".into()));
    }

    #[test]
    fn empty_list_selects_nothing() {
        assert!(select(&[]).is_none());
    }

    #[tokio::test]
    async fn permission_denied_yields_no_selection() {
        let registry = MemoryRegistry::new();
        registry.add_session(MemorySession::new("player"));
        registry.set_permission_denied(true);

        let mut selector = ActiveSessionSelector::new(registry.clone(), RefreshTrigger::new());
        assert!(selector.refresh().await.is_none());
        assert!(selector.selected().get().is_none());
    }

    #[tokio::test]
    async fn moving_selection_moves_the_listener() {
        let registry = MemoryRegistry::new();
        let first = MemorySession::new("first");
        let second = MemorySession::new("second");
        registry.add_session(first.clone());
        registry.add_session(second.clone());

        let mut selector = ActiveSessionSelector::new(registry.clone(), RefreshTrigger::new());
        assert_eq!(selector.refresh().await.map(|s| s.id().to_string()), Some("first".into()));
        assert_eq!(first.listener_count(), 1);
        assert_eq!(second.listener_count(), 0);

        second.set_playback_state(NativePlaybackState::Playing);
        assert_eq!(selector.refresh().await.map(|s| s.id().to_string()), Some("second".into()));
        assert_eq!(first.listener_count(), 0);
        assert_eq!(second.listener_count(), 1);
        assert_eq!(selector.selected().get().map(|s| s.id().to_string()), Some("second".into()));
    }

    #[tokio::test]
    async fn unchanged_selection_keeps_a_single_listener() {
        let registry = MemoryRegistry::new();
        let session = MemorySession::new("only");
        registry.add_session(session.clone());

        let mut selector = ActiveSessionSelector::new(registry.clone(), RefreshTrigger::new());
        for _ in 0..3 {
            selector.refresh().await;
        }
        assert_eq!(session.listener_count(), 1);
        assert_eq!(registry.subscribe_calls(), 1);
    }

    #[tokio::test]
    async fn vanished_session_is_released() {
        let registry = MemoryRegistry::new();
        let session = MemorySession::new("gone-soon");
        registry.add_session(session.clone());

        let mut selector = ActiveSessionSelector::new(registry.clone(), RefreshTrigger::new());
        selector.refresh().await;
        registry.remove_session(&"gone-soon".into());

        assert!(selector.refresh().await.is_none());
        assert_eq!(session.listener_count(), 0);
        assert_eq!(registry.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn failed_subscribe_is_retried_on_the_next_pass() {
        let memory = MemoryRegistry::new();
        let session = MemorySession::new("player");
        memory.add_session(session.clone());
        let registry = UnreliableRegistry::new(memory.clone());
        registry.failing_subscribes.store(1, Ordering::SeqCst);

        let mut selector = ActiveSessionSelector::new(registry.clone(), RefreshTrigger::new());
        assert!(selector.refresh().await.is_some());
        assert_eq!(session.listener_count(), 0);

        for _ in 0..3 {
            selector.refresh().await;
        }
        assert_eq!(session.listener_count(), 1);
        assert_eq!(memory.subscribe_calls(), 1);
    }

    #[tokio::test]
    async fn listing_failure_reads_as_empty_and_recovers() {
        let memory = MemoryRegistry::new();
        let session = MemorySession::new("player");
        memory.add_session(session.clone());
        let registry = UnreliableRegistry::new(memory.clone());

        let mut selector = ActiveSessionSelector::new(registry.clone(), RefreshTrigger::new());
        assert!(selector.refresh().await.is_some());

        registry.list_fails.store(true, Ordering::SeqCst);
        assert!(selector.refresh().await.is_none());
        assert!(selector.selected().get().is_none());
        assert_eq!(session.listener_count(), 0);

        registry.list_fails.store(false, Ordering::SeqCst);
        assert!(selector.refresh().await.is_some());
        assert_eq!(session.listener_count(), 1);
    }
}
