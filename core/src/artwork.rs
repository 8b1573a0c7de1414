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
use std::io::Cursor;
use std::sync::Arc;

use image::{ImageReader, RgbaImage};
use thiserror::Error;

use crate::config::ArtworkConfig;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Artwork payload of {size} bytes exceeds the {limit} bytes limit")]
    TooLarge { size: usize, limit: usize },
    #[error("Artwork of {width}x{height} px exceeds the {limit} px limit")]
    Oversized { width: u32, height: u32, limit: u32 },
    #[error("Malformed artwork: {0}")]
    Malformed(String),
}

impl From<image::ImageError> for DecodeError {
    fn from(e: image::ImageError) -> Self {
        DecodeError::Malformed(e.to_string())
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(e: std::io::Error) -> Self {
        DecodeError::Malformed(e.to_string())
    }
}

/// Limits applied before any pixel is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtworkLimits {
    pub max_bytes: usize,
    pub max_dimension: u32,
}

impl Default for ArtworkLimits {
    fn default() -> Self {
        Self { max_bytes: 20 * 1024 * 1024, max_dimension: 4096 }
    }
}

impl From<&ArtworkConfig> for ArtworkLimits {
    fn from(config: &ArtworkConfig) -> Self {
        Self { max_bytes: config.max_bytes, max_dimension: config.max_dimension }
    }
}

/// Decoded RGBA artwork. Clones share the pixel buffer.
#[derive(Clone)]
pub struct Artwork {
    image: Arc<RgbaImage>,
}

impl Artwork {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Raw RGBA8 pixels, row major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }
}

impl PartialEq for Artwork {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
            || (self.image.dimensions() == other.image.dimensions()
                && self.image.as_raw() == other.image.as_raw())
    }
}

impl fmt::Debug for Artwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Artwork({}x{})", self.width(), self.height())
    }
}

/// Decode encoded artwork into RGBA pixels, rejecting payloads that break `limits`.
pub fn decode_artwork(bytes: &[u8], limits: ArtworkLimits) -> Result<Artwork, DecodeError> {
    if bytes.len() > limits.max_bytes {
        return Err(DecodeError::TooLarge { size: bytes.len(), limit: limits.max_bytes });
    }

    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    if width > limits.max_dimension || height > limits.max_dimension {
        return Err(DecodeError::Oversized { width, height, limit: limits.max_dimension });
    }

    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?
        .to_rgba8();
    Ok(Artwork { image: Arc::new(image) })
}
