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

use log::{debug, info, warn};

use crate::config::AdSuppressionConfig;
use crate::volume::VolumeControl;

/// Best-effort advertisement classifier based on title/artist substrings.
///
/// Legitimate tracks containing one of the patterns (a song called "Premium") are muted too.
#[derive(Debug, Clone)]
pub struct AdClassifier {
    patterns: Vec<String>,
    provider_name: String,
}

impl AdClassifier {
    pub fn new<I, S>(patterns: I, provider_name: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            provider_name: provider_name.to_lowercase(),
        }
    }

    pub fn from_config(config: &AdSuppressionConfig) -> Self {
        Self::new(&config.patterns, &config.provider_name)
    }

    pub fn is_ad(&self, title: &str, artist: &str) -> bool {
        let title = title.to_lowercase();
        let artist = artist.to_lowercase();
        let has_pattern = self
            .patterns
            .iter()
            .any(|p| title.contains(p.as_str()) || artist.contains(p.as_str()));
        let is_provider_artist = !self.provider_name.is_empty() && artist == self.provider_name;
        has_pattern || is_provider_artist
    }
}

impl Default for AdClassifier {
    fn default() -> Self {
        Self::from_config(&AdSuppressionConfig::default())
    }
}

/// Mute bookkeeping. The saved volume only exists while muted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MuteState {
    #[default]
    Unmuted,
    Muted { saved_volume: u32 },
}

impl MuteState {
    pub fn is_muted(&self) -> bool {
        matches!(self, MuteState::Muted { .. })
    }

    pub fn saved_volume(&self) -> Option<u32> {
        match self {
            MuteState::Muted { saved_volume } => Some(*saved_volume),
            MuteState::Unmuted => None,
        }
    }
}

/// Drives mute/unmute side effects from the classification of every reconciled track.
///
/// Volume is captured once when entering [`MuteState::Muted`] and restored once when leaving
/// it. Repeated ads or repeated regular tracks do not touch the audio system. Failed device
/// calls leave the state unchanged so the next reconciliation retries the transition.
pub struct AdSuppressor {
    classifier: AdClassifier,
    volume: Arc<dyn VolumeControl>,
    enabled: bool,
    state: MuteState,
}

impl AdSuppressor {
    pub fn new(classifier: AdClassifier, volume: Arc<dyn VolumeControl>) -> Self {
        Self { classifier, volume, enabled: true, state: MuteState::Unmuted }
    }

    pub fn from_config(config: &AdSuppressionConfig, volume: Arc<dyn VolumeControl>) -> Self {
        let mut suppressor = Self::new(AdClassifier::from_config(config), volume);
        suppressor.enabled = config.enabled;
        suppressor
    }

    pub fn state(&self) -> MuteState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Classify a track and apply the corresponding transition.
    pub async fn on_track(&mut self, title: &str, artist: &str) -> MuteState {
        if !self.enabled {
            return self.state;
        }
        if self.classifier.is_ad(title, artist) {
            debug!("Ad detected: {} by {}", title, artist);
            self.mute().await;
        } else {
            self.unmute().await;
        }
        self.state
    }

    /// Leave the muted state, if any. Used when the engine stops so the device is not left silent.
    pub async fn restore(&mut self) -> MuteState {
        self.unmute().await;
        self.state
    }

    async fn mute(&mut self) {
        if self.state.is_muted() {
            return;
        }
        let saved_volume = match self.volume.get_volume().await {
            Ok(volume) => volume,
            Err(e) => {
                warn!("Failed to read volume before muting: {}", e);
                return;
            }
        };
        if let Err(e) = self.volume.set_volume(0).await {
            warn!("Failed to mute volume: {}", e);
            return;
        }
        self.state = MuteState::Muted { saved_volume };
        info!("Volume muted (original: {})", saved_volume);
    }

    async fn unmute(&mut self) {
        let MuteState::Muted { saved_volume } = self.state else {
            return;
        };
        if let Err(e) = self.volume.set_volume(saved_volume).await {
            warn!("Failed to restore volume to {}, retrying on next track update: {}", saved_volume, e);
            return;
        }
        self.state = MuteState::Unmuted;
        info!("Volume restored to: {}", saved_volume);
    }
}
