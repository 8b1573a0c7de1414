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

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Audio device error: {0}")]
pub struct DeviceError(pub String);

/// Music stream volume of the platform audio system, in platform steps.
#[async_trait]
pub trait VolumeControl: Send + Sync {
    async fn get_volume(&self) -> Result<u32, DeviceError>;

    async fn set_volume(&self, volume: u32) -> Result<(), DeviceError>;
}
