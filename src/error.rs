// src/error.rs
//
// Unified error handling for recast-image
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - UserError: Invalid input, recoverable
// - CodecError: Format/encoding issues
// - ResourceLimit: Memory/size/dimension limits
// - InternalBug: Library bugs (should not happen)

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy for the embedding shell.
///
/// This 4-tier taxonomy enables proper error handling:
/// - UserError: Invalid input, recoverable by user
/// - CodecError: Format/encoding issues
/// - ResourceLimit: Memory/size/dimension limits
/// - InternalBug: Library bugs (should not happen)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Invalid input, recoverable by user
    UserError,
    /// Format/encoding issues
    CodecError,
    /// Memory/size/dimension limits
    ResourceLimit,
    /// Library bugs (should not happen)
    InternalBug,
}

impl ErrorCategory {
    /// Stable string code for the category (exposed to the shell as `error.code`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserError => "RECAST_USER_ERROR",
            Self::CodecError => "RECAST_CODEC_ERROR",
            Self::ResourceLimit => "RECAST_RESOURCE_LIMIT",
            Self::InternalBug => "RECAST_INTERNAL_BUG",
        }
    }
}

/// recast-image error types
///
/// All errors are type-safe and provide clear, actionable messages.
/// No numeric error codes - just clear error variants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConvertError {
    // Request boundary errors
    #[error("Unsupported target format: '{format}'. Use: jpeg, jpg, png, webp, gif, avif, ico")]
    UnsupportedFormat { format: Cow<'static, str> },

    // Decode errors
    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    #[error("Corrupted image data")]
    CorruptedImage,

    // Limit errors
    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    #[error("Input size {size} bytes exceeds maximum {max} bytes")]
    SourceTooLarge { size: u64, max: u64 },

    // Processing errors
    #[error("Resize failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResizeFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    // Encode errors
    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Icon packing failed: {message}")]
    IconPackFailed { message: Cow<'static, str> },

    // Internal errors
    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

// Constructor helpers - keep call sites terse and message formatting in one place.
impl ConvertError {
    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn corrupted_image() -> Self {
        Self::CorruptedImage
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn source_too_large(size: u64, max: u64) -> Self {
        Self::SourceTooLarge { size, max }
    }

    pub fn resize_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResizeFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn icon_pack_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::IconPackFailed {
            message: message.into(),
        }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (user can fix it)
    ///
    /// Consistent with category():
    /// - UserError errors are always recoverable
    /// - ResourceLimit errors are recoverable (user can shrink or re-export the image)
    /// - CodecError and InternalBug errors are not recoverable
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::UserError | ErrorCategory::ResourceLimit => true,
            ErrorCategory::CodecError | ErrorCategory::InternalBug => false,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            // UserError: Invalid input, recoverable
            Self::UnsupportedFormat { .. } => ErrorCategory::UserError,

            // CodecError: Format/encoding issues
            // Note: ResizeFailed is a processing failure during image
            // transformation, which sits closest to encode/decode issues.
            Self::DecodeFailed { .. }
            | Self::CorruptedImage
            | Self::ResizeFailed { .. }
            | Self::EncodeFailed { .. }
            | Self::IconPackFailed { .. } => ErrorCategory::CodecError,

            // ResourceLimit: size/dimension limits
            Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. }
            | Self::SourceTooLarge { .. } => ErrorCategory::ResourceLimit,

            // InternalBug: Library bugs (should not happen)
            Self::InternalPanic { .. } => ErrorCategory::InternalBug,
        }
    }

    /// Actionable hint for the user, where one exists.
    ///
    /// The shell forwards this verbatim in the failure payload. Most errors
    /// carry enough context in their message; only a few classes benefit from
    /// a concrete "what to try instead".
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::IconPackFailed { .. } => Some(
                "Use a square image with a transparent background for best icon results",
            ),
            Self::DimensionExceedsLimit { .. } | Self::PixelCountExceedsLimit { .. } => {
                Some("Resize the image before converting it")
            }
            Self::SourceTooLarge { .. } => {
                Some("Re-export the image at a lower quality or smaller size")
            }
            Self::DecodeFailed { .. } | Self::CorruptedImage => {
                Some("Try a different image or re-save it in a common format")
            }
            Self::UnsupportedFormat { .. }
            | Self::ResizeFailed { .. }
            | Self::EncodeFailed { .. }
            | Self::InternalPanic { .. } => None,
        }
    }

    /// Structured failure payload for the embedding shell.
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            error: self.to_string(),
            suggestion: self.suggestion().map(str::to_string),
        }
    }
}

/// The `{ error, suggestion? }` shape the shell serializes on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    pub error: String,
    pub suggestion: Option<String>,
}
