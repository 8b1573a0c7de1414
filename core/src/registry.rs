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

use async_trait::async_trait;
use thiserror::Error;

use crate::session::{Session, SessionId};
use crate::trigger::RefreshTrigger;

/// Handle returned by the registry for every listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// Access to media sessions has been revoked by the user.
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Session {0} is no longer available")]
    SessionGone(SessionId),
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Platform capability that enumerates media sessions and pushes change notifications.
///
/// Notifications are delivered by firing the [`RefreshTrigger`] handed over at subscription time;
/// implementations may fire it from any thread. After [`SessionRegistry::unsubscribe`] returns
/// the registry must not fire the trigger of that subscription again.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Currently active sessions.
    ///
    /// The order is the tie-break used by session selection, so implementations must return a
    /// deterministic order (the platform's own ranking, or most recently active first).
    async fn list_active_sessions(&self) -> Result<Vec<Session>, RegistryError>;

    /// Register for metadata and playback state changes of one session.
    async fn subscribe(
        &self,
        session: &Session,
        trigger: RefreshTrigger,
    ) -> Result<SubscriptionId, RegistryError>;

    /// Register for changes of the session list itself.
    async fn subscribe_session_list(
        &self,
        trigger: RefreshTrigger,
    ) -> Result<SubscriptionId, RegistryError>;

    async fn unsubscribe(&self, subscription: SubscriptionId);
}

/// Whether the user granted access to other apps' media sessions.
///
/// Polled by the presentation layer to decide whether to show a permission prompt; the engine
/// itself only observes revocation through [`RegistryError::PermissionDenied`].
pub trait PermissionState: Send + Sync {
    fn is_monitoring_permission_granted(&self) -> bool;
}
