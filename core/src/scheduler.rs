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

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::select;
use tokio::time::MissedTickBehavior;

use crate::reconciler::MetadataReconciler;
use crate::registry::SessionRegistry;
use crate::selector::ActiveSessionSelector;
use crate::service::{spawn_service, ServiceHandle};
use crate::snapshot::PlaybackSnapshot;
use crate::trigger::RefreshTrigger;

/// Selector → Reconciler → Ad-Suppression, run as one unit by a single owner.
pub struct SyncPipeline {
    selector: ActiveSessionSelector,
    reconciler: MetadataReconciler,
}

impl SyncPipeline {
    pub fn new(selector: ActiveSessionSelector, reconciler: MetadataReconciler) -> Self {
        Self { selector, reconciler }
    }

    pub async fn run_once(&mut self) -> PlaybackSnapshot {
        let session = self.selector.refresh().await;
        self.reconciler.reconcile(session.as_ref()).await
    }

    /// Detach from the selected session and close any open mute episode.
    pub async fn release(&mut self) {
        self.selector.release().await;
        self.reconciler.shutdown().await;
    }
}

/// Spawn the scheduler loop.
///
/// The pipeline runs once right away, then again on every trigger fire (registry push
/// notifications) and on every `poll_interval` tick. The loop is the only owner of the pipeline,
/// so runs never overlap; fires that arrive during a run are coalesced by the trigger into one
/// follow-up run.
///
/// On shutdown the trigger is closed and every registry listener is removed before the task
/// completes.
pub fn run_sync_scheduler(
    mut pipeline: SyncPipeline,
    registry: Arc<dyn SessionRegistry>,
    trigger: RefreshTrigger,
    poll_interval: Duration,
) -> ServiceHandle {
    spawn_service(move |mut stop| async move {
        let list_subscription = match registry.subscribe_session_list(trigger.clone()).await {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!("Session list notifications unavailable, relying on polling: {}", e);
                None
            }
        };

        pipeline.run_once().await;

        let mut poll = tokio::time::interval(poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll.tick().await;

        info!("Media sync scheduler started (poll every {:?})", poll_interval);
        loop {
            select! {
                biased;
                _ = stop.signaled() => {
                    info!("Media sync scheduler shutdown requested");
                    break;
                }
                _ = trigger.fired() => {
                    trace!("Refresh triggered by notification");
                }
                _ = poll.tick() => {
                    trace!("Refresh triggered by poll");
                }
            }
            pipeline.run_once().await;
        }

        trigger.close();
        if let Some(subscription) = list_subscription {
            registry.unsubscribe(subscription).await;
        }
        pipeline.release().await;
        debug!("Media sync scheduler stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ad_suppression::AdSuppressor;
    use crate::artwork::ArtworkLimits;
    use crate::config::AdSuppressionConfig;
    use crate::memory::{MemoryRegistry, MemorySession, MemoryVolume};
    use crate::registry::SubscriptionId;
    use crate::session::NativePlaybackState;
    use crate::snapshot::{SnapshotPublisher, SnapshotReceiver};
    use tokio::time::timeout;

    struct Fixture {
        registry: Arc<MemoryRegistry>,
        volume: Arc<MemoryVolume>,
        snapshots: SnapshotReceiver,
        handle: ServiceHandle,
    }

    fn start(poll_interval: Duration) -> Fixture {
        let registry = MemoryRegistry::new();
        let volume = MemoryVolume::new(7);
        let trigger = RefreshTrigger::new();
        let publisher = SnapshotPublisher::new();
        let snapshots = publisher.subscribe();
        let selector = ActiveSessionSelector::new(registry.clone(), trigger.clone());
        let suppressor = AdSuppressor::from_config(&AdSuppressionConfig::default(), volume.clone());
        let reconciler = MetadataReconciler::new(ArtworkLimits::default(), suppressor, publisher);
        let handle = run_sync_scheduler(
            SyncPipeline::new(selector, reconciler),
            registry.clone(),
            trigger,
            poll_interval,
        );
        Fixture { registry, volume, snapshots, handle }
    }

    async fn wait_for_title(snapshots: &mut SnapshotReceiver, title: &str) {
        timeout(Duration::from_secs(5), snapshots.wait_for(|s| s.title == title))
            .await
            .expect("snapshot not published in time")
            .unwrap();
    }

    #[tokio::test]
    async fn push_notification_refreshes_without_waiting_for_poll() {
        let mut fixture = start(Duration::from_secs(3600));
        let session = MemorySession::new("player");
        session.set_playback_state(NativePlaybackState::Playing);
        session.set_track("So What", "Miles Davis");
        fixture.registry.add_session(session.clone());
        wait_for_title(&mut fixture.snapshots, "So What").await;

        session.set_track("Freddie Freeloader", "Miles Davis");
        wait_for_title(&mut fixture.snapshots, "Freddie Freeloader").await;
        fixture.handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn poll_picks_up_changes_that_were_never_notified() {
        let mut fixture = start(Duration::from_secs(1));
        while fixture.registry.active_subscriptions() == 0 {
            tokio::task::yield_now().await;
        }
        // drop the session-list listener so only the poll can notice the new session
        fixture.registry.unsubscribe(SubscriptionId(1)).await;
        assert_eq!(fixture.registry.active_subscriptions(), 0);

        let session = MemorySession::new("silent");
        session.set_playback_state(NativePlaybackState::Playing);
        session.set_track("Blue in Green", "Miles Davis");
        fixture.registry.add_session(session);

        wait_for_title(&mut fixture.snapshots, "Blue in Green").await;
        fixture.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_removes_every_listener_and_restores_volume() {
        let mut fixture = start(Duration::from_secs(3600));
        let session = MemorySession::new("ads");
        session.set_playback_state(NativePlaybackState::Playing);
        session.set_track("Advertisement", "Spotify");
        fixture.registry.add_session(session.clone());
        wait_for_title(&mut fixture.snapshots, "Advertisement").await;
        assert_eq!(fixture.volume.volume(), 0);

        fixture.handle.shutdown().await.unwrap();
        assert_eq!(fixture.registry.active_subscriptions(), 0);
        assert_eq!(session.listener_count(), 0);
        assert_eq!(fixture.volume.volume(), 7);
    }
}
