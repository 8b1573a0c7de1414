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
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;

use crate::definitions::THEME_PREFERENCE_KEY;
use crate::preferences::PreferenceStore;

/// Visual theme of the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThemeType {
    #[default]
    Neon,
    Minimal,
    Analog,
}

impl ThemeType {
    pub const ALL: [ThemeType; 3] = [ThemeType::Neon, ThemeType::Minimal, ThemeType::Analog];

    pub fn name(&self) -> &'static str {
        match self {
            ThemeType::Neon => "Neon",
            ThemeType::Minimal => "Minimal",
            ThemeType::Analog => "Analog",
        }
    }

    /// Next theme in Neon → Minimal → Analog → Neon order.
    pub fn cycle(self) -> Self {
        match self {
            ThemeType::Neon => ThemeType::Minimal,
            ThemeType::Minimal => ThemeType::Analog,
            ThemeType::Analog => ThemeType::Neon,
        }
    }
}

impl fmt::Display for ThemeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown theme: {0}")]
pub struct UnknownTheme(pub String);

impl FromStr for ThemeType {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThemeType::ALL
            .into_iter()
            .find(|theme| theme.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

/// The selected theme, persisted through a [`PreferenceStore`].
pub struct ThemeSelection {
    store: Arc<dyn PreferenceStore>,
    current: ThemeType,
}

impl ThemeSelection {
    /// Read the stored theme; a missing or unrecognised value selects [`ThemeType::Neon`].
    pub fn load(store: Arc<dyn PreferenceStore>) -> Self {
        let current = match store.get(THEME_PREFERENCE_KEY) {
            Some(value) => value.parse().unwrap_or_else(|e| {
                warn!("{}, falling back to {}", e, ThemeType::default());
                ThemeType::default()
            }),
            None => ThemeType::default(),
        };
        Self { store, current }
    }

    pub fn current(&self) -> ThemeType {
        self.current
    }

    /// Select `theme` and persist it. The selection changes even when persisting fails.
    pub fn set(&mut self, theme: ThemeType) -> anyhow::Result<()> {
        debug!("Selecting theme {}", theme);
        self.current = theme;
        self.store.set(THEME_PREFERENCE_KEY, theme.name())
    }

    pub fn cycle(&mut self) -> anyhow::Result<ThemeType> {
        let next = self.current.cycle();
        self.set(next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::MemoryPreferenceStore;

    #[test]
    fn cycle_wraps_around() {
        assert_eq!(ThemeType::Neon.cycle(), ThemeType::Minimal);
        assert_eq!(ThemeType::Minimal.cycle(), ThemeType::Analog);
        assert_eq!(ThemeType::Analog.cycle(), ThemeType::Neon);
    }

    #[test]
    fn names_parse_back() {
        for theme in ThemeType::ALL {
            assert_eq!(theme.name().parse::<ThemeType>(), Ok(theme));
        }
        assert_eq!("minimal".parse::<ThemeType>(), Ok(ThemeType::Minimal));
        assert!("Vapor".parse::<ThemeType>().is_err());
    }

    #[test]
    fn missing_or_unknown_preference_selects_neon() {
        let store = Arc::new(MemoryPreferenceStore::new());
        assert_eq!(ThemeSelection::load(store.clone()).current(), ThemeType::Neon);

        store.set(THEME_PREFERENCE_KEY, "Vapor").unwrap();
        assert_eq!(ThemeSelection::load(store).current(), ThemeType::Neon);
    }

    #[test]
    fn cycling_persists_the_selection() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let mut selection = ThemeSelection::load(store.clone());

        assert_eq!(selection.cycle().unwrap(), ThemeType::Minimal);
        assert_eq!(selection.cycle().unwrap(), ThemeType::Analog);
        assert_eq!(store.get(THEME_PREFERENCE_KEY).as_deref(), Some("Analog"));
        assert_eq!(ThemeSelection::load(store).current(), ThemeType::Analog);
    }
}
