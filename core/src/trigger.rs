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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Coalescing gate between refresh sources and the scheduler loop.
///
/// Registry adapters call [`RefreshTrigger::fire`] from whatever thread the platform delivers its
/// callbacks on. Fires that arrive while the scheduler is busy collapse into a single pending
/// re-run: the gate holds at most one permit. After [`RefreshTrigger::close`] every fire is
/// dropped.
#[derive(Clone, Default)]
pub struct RefreshTrigger {
    inner: Arc<TriggerInner>,
}

#[derive(Default)]
struct TriggerInner {
    notify: Notify,
    closed: AtomicBool,
}

impl RefreshTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a re-run of the sync pipeline. Never blocks.
    pub fn fire(&self) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        self.inner.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Resolves once a fire is pending, consuming it.
    pub(crate) async fn fired(&self) {
        self.inner.notify.notified().await;
    }

    pub(crate) fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for RefreshTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTrigger").field("closed", &self.is_closed()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    async fn is_pending(trigger: &RefreshTrigger) -> bool {
        timeout(Duration::from_millis(20), trigger.fired()).await.is_ok()
    }

    #[tokio::test]
    async fn burst_of_fires_coalesces_into_one_pending_run() {
        let trigger = RefreshTrigger::new();
        for _ in 0..10 {
            trigger.fire();
        }
        assert!(is_pending(&trigger).await);
        assert!(!is_pending(&trigger).await);
    }

    #[tokio::test]
    async fn fires_from_foreign_threads_reach_the_gate() {
        let trigger = RefreshTrigger::new();
        let remote = trigger.clone();
        std::thread::spawn(move || remote.fire()).join().unwrap();
        assert!(is_pending(&trigger).await);
    }

    #[tokio::test]
    async fn closed_trigger_drops_fires() {
        let trigger = RefreshTrigger::new();
        trigger.close();
        trigger.fire();
        assert!(trigger.is_closed());
        assert!(!is_pending(&trigger).await);
    }
}
