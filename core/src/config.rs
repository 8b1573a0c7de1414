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

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use log::debug;
use serde::Deserialize;

use crate::definitions::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};

/// Patterns that mark a track as an advertisement when found in its title or artist.
pub const DEFAULT_AD_PATTERNS: [&str; 6] =
    ["spotify", "advertisement", "ad break", "sponsored", "premium", "upgrade"];

/// Streaming provider whose own name as the artist marks an advertisement.
pub const DEFAULT_PROVIDER_NAME: &str = "spotify";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub poll_interval_ms: u64,
    pub ad_suppression: AdSuppressionConfig,
    pub artwork: ArtworkConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            ad_suppression: AdSuppressionConfig::default(),
            artwork: ArtworkConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdSuppressionConfig {
    pub enabled: bool,
    pub patterns: Vec<String>,
    pub provider_name: String,
}

impl Default for AdSuppressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: DEFAULT_AD_PATTERNS.iter().map(|p| p.to_string()).collect(),
            provider_name: DEFAULT_PROVIDER_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArtworkConfig {
    pub max_bytes: usize,
    pub max_dimension: u32,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self { max_bytes: 20 * 1024 * 1024, max_dimension: 4096 }
    }
}

impl EngineConfig {
    /// Load the configuration from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&data)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn from_toml_str(data: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(data)?)
    }

    /// Poll interval, never shorter than [`MIN_POLL_INTERVAL`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms).max(MIN_POLL_INTERVAL)
    }
}
