// src/policy.rs
//
// Target formats and their encode policies.
// One immutable mapping keyed by a closed enum - no per-call-site literals.

use crate::error::ConvertError;

// Tunable policy constants. These mirror common web-delivery defaults and are
// not protocol requirements.
const JPEG_QUALITY: u8 = 90;
const WEBP_QUALITY: u8 = 85;
const AVIF_QUALITY: u8 = 80;
const PNG_COMPRESSION: u8 = 9;

/// Output format accepted at the request boundary.
///
/// The enum is closed on purpose: every variant has a total `FormatPolicy`,
/// and anything else fails with `UnsupportedFormat` before reaching the
/// encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
    Avif,
    Ico,
}

/// Encode policy for one target format.
///
/// Process-wide, read-only; constructed by `TargetFormat::policy` which is
/// total over the enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatPolicy {
    /// MIME type reported alongside the output bytes.
    pub mime_type: &'static str,
    /// Quality knob (1-100) for lossy targets. None for lossless or
    /// quantized targets that take no quality parameter.
    pub quality: Option<u8>,
    /// Compression level for lossless targets (png: 0-9).
    pub compression: Option<u8>,
    /// Lossless targets ignore `quality` entirely.
    pub lossless: bool,
}

impl TargetFormat {
    /// Parse a request token. `jpg` is an alias for `jpeg`; matching is
    /// case-insensitive.
    pub fn from_token(token: &str) -> Result<Self, ConvertError> {
        match token.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            "gif" => Ok(Self::Gif),
            "avif" => Ok(Self::Avif),
            "ico" => Ok(Self::Ico),
            other => Err(ConvertError::unsupported_format(other.to_string())),
        }
    }

    /// Canonical token (also the download extension).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Avif => "avif",
            Self::Ico => "ico",
        }
    }

    /// The encode policy for this target.
    pub fn policy(&self) -> FormatPolicy {
        match self {
            Self::Jpeg => FormatPolicy {
                mime_type: "image/jpeg",
                quality: Some(JPEG_QUALITY),
                compression: None,
                lossless: false,
            },
            Self::Png => FormatPolicy {
                mime_type: "image/png",
                quality: None,
                compression: Some(PNG_COMPRESSION),
                lossless: true,
            },
            Self::Webp => FormatPolicy {
                mime_type: "image/webp",
                quality: Some(WEBP_QUALITY),
                compression: None,
                lossless: false,
            },
            // GIF is palette-quantized; it takes no quality parameter.
            Self::Gif => FormatPolicy {
                mime_type: "image/gif",
                quality: None,
                compression: None,
                lossless: false,
            },
            Self::Avif => FormatPolicy {
                mime_type: "image/avif",
                quality: Some(AVIF_QUALITY),
                compression: None,
                lossless: false,
            },
            // Icon renditions are lossless PNG payloads inside the container.
            Self::Ico => FormatPolicy {
                mime_type: "image/x-icon",
                quality: None,
                compression: Some(PNG_COMPRESSION),
                lossless: true,
            },
        }
    }

    /// MIME type shortcut (policy lookup is total, so this never fails).
    pub fn mime_type(&self) -> &'static str {
        self.policy().mime_type
    }

    /// All variants, in the order the shell lists them.
    pub fn all() -> [TargetFormat; 6] {
        [
            Self::Jpeg,
            Self::Png,
            Self::Webp,
            Self::Gif,
            Self::Avif,
            Self::Ico,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_parsing_accepts_aliases_and_case() {
        assert_eq!(TargetFormat::from_token("jpg").unwrap(), TargetFormat::Jpeg);
        assert_eq!(
            TargetFormat::from_token("JPEG").unwrap(),
            TargetFormat::Jpeg
        );
        assert_eq!(TargetFormat::from_token("Ico").unwrap(), TargetFormat::Ico);
    }

    #[test]
    fn unknown_token_is_rejected_at_the_boundary() {
        let err = TargetFormat::from_token("tiff").unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    }

    #[test]
    fn policy_is_total_and_mime_types_are_stable() {
        for format in TargetFormat::all() {
            let policy = format.policy();
            assert!(policy.mime_type.starts_with("image/"));
            if policy.lossless {
                assert!(policy.quality.is_none(), "{format:?} is lossless");
            }
        }
        assert_eq!(TargetFormat::Ico.mime_type(), "image/x-icon");
        assert_eq!(TargetFormat::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn lossy_quality_defaults() {
        assert_eq!(TargetFormat::Jpeg.policy().quality, Some(90));
        assert_eq!(TargetFormat::Webp.policy().quality, Some(85));
        assert_eq!(TargetFormat::Avif.policy().quality, Some(80));
        assert_eq!(TargetFormat::Png.policy().compression, Some(9));
    }
}
