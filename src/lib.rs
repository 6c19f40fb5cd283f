// lib.rs
//
// recast-image: an image format conversion engine.
//
// Design goals:
// - One decode per request, reused by every downstream stage
// - Per-format encode policy in one immutable table
// - Icon packing that degrades instead of failing
// - Stateless across requests, bounded concurrency under load

// Memory allocator optimization - jemalloc for better performance
// Note: jemalloc is not supported on Windows/MSVC, so we exclude it on that platform
#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

pub mod engine;
pub mod error;
pub mod policy;

pub use engine::{ConversionOutput, ConversionRequest, Converter, Limits, SourceImage};
pub use error::{ConvertError, ErrorCategory, ErrorPayload};
pub use policy::{FormatPolicy, TargetFormat};

use std::io::{BufRead, Cursor, Seek};

/// Image metadata returned by `inspect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Detected format token (jpeg, png, webp, gif, ...), if recognized.
    pub format: Option<String>,
}

fn read_image_info<R: BufRead + Seek>(reader: R) -> Result<ImageInfo, ConvertError> {
    let reader = image::ImageReader::new(reader)
        .with_guessed_format()
        .map_err(|e| ConvertError::decode_failed(format!("failed to read image header: {e}")))?;

    let format = reader.format().map(|f| format!("{f:?}").to_lowercase());
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ConvertError::decode_failed(format!("failed to read dimensions: {e}")))?;

    Ok(ImageInfo {
        width,
        height,
        format,
    })
}

/// Inspect image metadata WITHOUT decoding pixels.
/// This reads only the header bytes - extremely fast.
///
/// Use this to check dimensions before processing, or to reject images that
/// are too large without wasting CPU on decoding.
pub fn inspect(data: &[u8]) -> Result<ImageInfo, ConvertError> {
    read_image_info(Cursor::new(data))
}

/// Input format tokens the decoder set accepts.
pub fn supported_input_formats() -> Vec<&'static str> {
    vec!["jpeg", "jpg", "png", "webp", "gif", "bmp", "ico"]
}

/// Output format tokens accepted at the request boundary.
pub fn supported_output_formats() -> Vec<&'static str> {
    vec!["jpeg", "jpg", "png", "webp", "gif", "avif", "ico"]
}
