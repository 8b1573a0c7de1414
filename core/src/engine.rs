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

use log::{info, warn};

use crate::ad_suppression::AdSuppressor;
use crate::artwork::ArtworkLimits;
use crate::config::EngineConfig;
use crate::controls::TransportControls;
use crate::reconciler::MetadataReconciler;
use crate::registry::SessionRegistry;
use crate::scheduler::{run_sync_scheduler, SyncPipeline};
use crate::selector::ActiveSessionSelector;
use crate::service::ServiceHandle;
use crate::snapshot::{PlaybackSnapshot, SnapshotPublisher, SnapshotReceiver};
use crate::trigger::RefreshTrigger;
use crate::volume::VolumeControl;

/// Running media synchronization: selection, reconciliation and ad suppression driven by registry
/// notifications and a periodic poll.
///
/// Every piece of state lives in the engine instance, so independent engines can run side by
/// side. Dropping the engine requests a stop without waiting for it; use [`MediaSyncEngine::stop`]
/// to wait until every listener is removed.
pub struct MediaSyncEngine {
    handle: ServiceHandle,
    snapshots: SnapshotReceiver,
    controls: TransportControls,
    trigger: RefreshTrigger,
}

impl MediaSyncEngine {
    /// Start the engine on the current tokio runtime. The first pass runs immediately.
    pub fn start(
        config: &EngineConfig,
        registry: Arc<dyn SessionRegistry>,
        volume: Arc<dyn VolumeControl>,
    ) -> Self {
        let trigger = RefreshTrigger::new();
        let publisher = SnapshotPublisher::new();
        let snapshots = publisher.subscribe();

        let selector = ActiveSessionSelector::new(registry.clone(), trigger.clone());
        let controls = TransportControls::new(selector.selected(), trigger.clone());
        let suppressor = AdSuppressor::from_config(&config.ad_suppression, volume);
        let reconciler = MetadataReconciler::new(ArtworkLimits::from(&config.artwork), suppressor, publisher);

        let poll_interval = config.poll_interval();
        let handle = run_sync_scheduler(
            SyncPipeline::new(selector, reconciler),
            registry,
            trigger.clone(),
            poll_interval,
        );
        info!(
            "Media sync engine started (ad suppression {})",
            if config.ad_suppression.enabled { "enabled" } else { "disabled" }
        );

        Self { handle, snapshots, controls, trigger }
    }

    /// New observer of the published snapshot. It starts out seeing the current value.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshots.clone()
    }

    pub fn current_snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn controls(&self) -> &TransportControls {
        &self.controls
    }

    /// Ask for a pass outside the regular schedule. Coalesces with pending requests.
    pub fn request_refresh(&self) {
        self.trigger.fire();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the engine and wait until every registry listener is removed and a muted volume is
    /// restored. Refresh requests made afterwards are ignored.
    pub async fn stop(self) {
        if let Err(e) = self.handle.shutdown().await {
            warn!("Media sync engine did not stop cleanly: {}", e);
        }
        info!("Media sync engine stopped");
    }
}
