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


use log::debug;

use crate::definitions::PlaybackState;
use crate::selector::SelectedSession;
use crate::session::{Session, SessionError};
use crate::snapshot::position_for_fraction;
use crate::trigger::RefreshTrigger;

/// User commands forwarded to whichever session is selected at the time of the call.
///
/// Every command is a no-op returning `Ok(())` while nothing is selected. A successful command
/// requests a refresh so the resulting state change shows up without waiting for the next poll.
#[derive(Clone, Debug)]
pub struct TransportControls {
    selected: SelectedSession,
    trigger: RefreshTrigger,
}

impl TransportControls {
    pub fn new(selected: SelectedSession, trigger: RefreshTrigger) -> Self {
        Self { selected, trigger }
    }

    /// Pause when playing, play otherwise.
    pub async fn toggle_play_pause(&self) -> Result<(), SessionError> {
        let Some(session) = self.selected.get() else {
            return Ok(());
        };
        let state = PlaybackState::from(session.playback_state());
        if state.is_playing() {
            debug!("Pausing {}", session.id());
            session.pause().await?;
        } else {
            debug!("Playing {}", session.id());
            session.play().await?;
        }
        self.trigger.fire();
        Ok(())
    }

    pub async fn skip_next(&self) -> Result<(), SessionError> {
        let Some(session) = self.selected.get() else {
            return Ok(());
        };
        session.skip_next().await?;
        self.trigger.fire();
        Ok(())
    }

    pub async fn skip_previous(&self) -> Result<(), SessionError> {
        let Some(session) = self.selected.get() else {
            return Ok(());
        };
        session.skip_previous().await?;
        self.trigger.fire();
        Ok(())
    }

    /// Seek to `fraction` of the track. Ignored when the session reports no duration or the
    /// fraction is not a finite number; out of range fractions are clamped into `[0, 1]`.
    pub async fn seek_to(&self, fraction: f32) -> Result<(), SessionError> {
        if !fraction.is_finite() {
            return Ok(());
        }
        let Some(session) = self.selected.get() else {
            return Ok(());
        };
        let Some(duration_ms) = duration_of(&session) else {
            return Ok(());
        };
        let position_ms = position_for_fraction(fraction, duration_ms);
        debug!("Seeking {} to {} ms", session.id(), position_ms);
        session.seek_to(position_ms).await?;
        self.trigger.fire();
        Ok(())
    }
}

fn duration_of(session: &Session) -> Option<u64> {
    session.metadata()?.duration_ms.filter(|d| *d > 0)
}
