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


pub mod ad_suppression;
pub mod artwork;
pub mod config;
pub mod controls;
pub mod definitions;
pub mod engine;
pub mod memory;
pub mod preferences;
pub mod reconciler;
pub mod registry;
pub mod scheduler;
pub mod selector;
pub mod service;
pub mod session;
pub mod snapshot;
pub mod theme;
pub mod trigger;
pub mod volume;

pub use ad_suppression::{AdClassifier, AdSuppressor, MuteState};
pub use artwork::{decode_artwork, Artwork, ArtworkLimits, DecodeError};
pub use config::EngineConfig;
pub use controls::TransportControls;
pub use definitions::PlaybackState;
pub use engine::MediaSyncEngine;
pub use preferences::{JsonFilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use registry::{PermissionState, RegistryError, SessionRegistry, SubscriptionId};
pub use session::{MediaSession, NativePlaybackState, Session, SessionError, SessionId, SessionMetadata};
pub use snapshot::{PlaybackSnapshot, SnapshotReceiver};
pub use theme::{ThemeSelection, ThemeType};
pub use trigger::RefreshTrigger;
pub use volume::{DeviceError, VolumeControl};
