// src/engine/validator.rs
//
// Input validation: byte-size and dimension limits, decode, bomb guards.

use crate::engine::decoder::{decode_image, probe_dimensions};
use crate::error::ConvertError;
use image::{DynamicImage, ImageFormat};

const LENIENT_MAX_DIMENSION: u32 = 10_000;
const LENIENT_MAX_BYTES: u64 = 15 * 1024 * 1024; // 15MB input cap
const LENIENT_MAX_PIXELS: u64 = 100_000_000; // 10000 x 10000

const STRICT_MAX_DIMENSION: u32 = 5_000;
const STRICT_MAX_BYTES: u64 = 10 * 1024 * 1024; // 10MB input cap
const STRICT_MAX_PIXELS: u64 = 25_000_000; // 5000 x 5000

/// Input acceptance limits.
///
/// These are configuration, not hardcoded literals: deployments disagree on
/// how large an upload is worth converting. Two presets are provided and
/// `lenient` is the default; both stay under the absolute
/// `engine::MAX_DIMENSION` ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum width or height of the decoded image.
    pub max_dimension: u32,
    /// Maximum raw input size in bytes, enforced before any decode work.
    pub max_bytes: u64,
    /// Maximum total pixels (width * height), the decompression-bomb guard.
    pub max_pixels: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self::lenient()
    }
}

impl Limits {
    /// 10000x10000 / 15MB - the default acceptance window.
    pub fn lenient() -> Self {
        Self {
            max_dimension: LENIENT_MAX_DIMENSION,
            max_bytes: LENIENT_MAX_BYTES,
            max_pixels: LENIENT_MAX_PIXELS,
        }
    }

    /// 5000x5000 / 10MB - for deployments that want cheap rejections.
    pub fn strict() -> Self {
        Self {
            max_dimension: STRICT_MAX_DIMENSION,
            max_bytes: STRICT_MAX_BYTES,
            max_pixels: STRICT_MAX_PIXELS,
        }
    }

    /// Byte-length gate. Runs before any decode work so oversized uploads
    /// never reach a codec.
    pub fn enforce_source_len(&self, len: usize) -> Result<(), ConvertError> {
        let len = len as u64;
        if len > self.max_bytes {
            return Err(ConvertError::source_too_large(len, self.max_bytes));
        }
        Ok(())
    }

    /// Dimension and pixel-count gates.
    pub fn enforce_dimensions(&self, width: u32, height: u32) -> Result<(), ConvertError> {
        if width > self.max_dimension || height > self.max_dimension {
            return Err(ConvertError::dimension_exceeds_limit(
                width.max(height),
                self.max_dimension,
            ));
        }
        let pixels = width as u64 * height as u64;
        if pixels > self.max_pixels {
            return Err(ConvertError::pixel_count_exceeds_limit(
                pixels,
                self.max_pixels,
            ));
        }
        Ok(())
    }
}

/// A validated, decoded source image.
///
/// Owned exclusively by the conversion that produced it and dropped at the
/// end of the request. The decode performed during validation IS the handle
/// the encoder consumes - the input bytes are never decoded twice.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: DynamicImage,
    format: Option<ImageFormat>,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    /// Container format detected from magic bytes (never from declared MIME).
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }

    #[cfg(test)]
    pub(crate) fn for_tests(image: DynamicImage) -> Self {
        Self {
            image,
            format: None,
        }
    }
}

/// Validate and decode one input.
///
/// Order matters:
/// 1. byte-length gate (cheapest, no decode work)
/// 2. header-only dimension probe (rejects bombs before pixel allocation)
/// 3. full decode
/// 4. re-check decoded dimensions (headers can lie)
pub fn validate(source_bytes: &[u8], limits: &Limits) -> Result<SourceImage, ConvertError> {
    limits.enforce_source_len(source_bytes.len())?;

    if let Some((width, height)) = probe_dimensions(source_bytes) {
        limits.enforce_dimensions(width, height)?;
    }

    let (image, format) = decode_image(source_bytes)?;

    limits.enforce_dimensions(image.width(), image.height())?;

    tracing::debug!(
        width = image.width(),
        height = image.height(),
        format = ?format,
        "input validated"
    );

    Ok(SourceImage { image, format })
}
