// src/engine/api.rs
//
// Converter: the public entrypoint for the conversion pipeline.
// Validating → Encoding → (IconPacking →) Succeeded | Failed, one request at
// a time, nothing retained between requests.

use crate::engine::encoder::encode_output;
use crate::engine::gate::conversion_gate;
use crate::engine::validator::{validate, Limits};
use crate::error::ConvertError;
use crate::policy::TargetFormat;
use std::time::Instant;

/// One incoming conversion call, as handed over by the shell.
///
/// `request_id` is opaque and only used to tag log events. `declared_mime`
/// is advisory: the validator detects the real format from magic bytes and a
/// mismatch is logged, never rejected on its own.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub source: Vec<u8>,
    pub target: TargetFormat,
    pub request_id: String,
    pub declared_mime: Option<String>,
}

/// Encoded output plus the metadata the shell needs to build a response.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub format: TargetFormat,
}

impl ConversionOutput {
    /// Download filename: `converted.<format>`.
    pub fn attachment_name(&self) -> String {
        format!("converted.{}", self.format.as_str())
    }
}

/// The conversion pipeline. Stateless across requests; the only
/// configuration is the acceptance limits.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    limits: Limits,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Convert `source` to `target`. The core boundary contract: either a
    /// complete decodable buffer with its MIME type, or a typed error.
    pub fn convert(
        &self,
        source: &[u8],
        target: TargetFormat,
    ) -> Result<ConversionOutput, ConvertError> {
        self.run(source, target, None, None)
    }

    /// Convert with request metadata attached to log events.
    pub fn convert_request(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionOutput, ConvertError> {
        self.run(
            &request.source,
            request.target,
            Some(&request.request_id),
            request.declared_mime.as_deref(),
        )
    }

    fn run(
        &self,
        source: &[u8],
        target: TargetFormat,
        request_id: Option<&str>,
        declared_mime: Option<&str>,
    ) -> Result<ConversionOutput, ConvertError> {
        // Hold a gate permit across the whole decode/resize/encode span
        let _permit = conversion_gate().acquire();
        let started = Instant::now();

        let source_image = validate(source, &self.limits)?;

        if let (Some(declared), Some(detected)) = (declared_mime, source_image.format()) {
            if !declared.eq_ignore_ascii_case(detected.to_mime_type()) {
                tracing::debug!(
                    request_id,
                    declared,
                    detected = detected.to_mime_type(),
                    "declared MIME disagrees with detected format"
                );
            }
        }

        let (bytes, mime_type) = encode_output(&source_image, target)?;

        tracing::debug!(
            request_id,
            target = target.as_str(),
            bytes_in = source.len(),
            bytes_out = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "conversion finished"
        );

        Ok(ConversionOutput {
            bytes,
            mime_type,
            format: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn converts_png_to_jpeg_preserving_dimensions() {
        let output = Converter::new()
            .convert(&png_bytes(40, 30), TargetFormat::Jpeg)
            .unwrap();
        assert_eq!(output.mime_type, "image/jpeg");
        let decoded = image::load_from_memory(&output.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[test]
    fn attachment_name_uses_canonical_token() {
        let output = Converter::new()
            .convert(&png_bytes(8, 8), TargetFormat::Ico)
            .unwrap();
        assert_eq!(output.attachment_name(), "converted.ico");
        assert_eq!(output.mime_type, "image/x-icon");
    }

    #[test]
    fn limits_are_enforced_before_encoding() {
        let converter = Converter::with_limits(Limits {
            max_dimension: 16,
            ..Limits::default()
        });
        let err = converter
            .convert(&png_bytes(32, 8), TargetFormat::Png)
            .unwrap_err();
        assert!(matches!(err, ConvertError::DimensionExceedsLimit { .. }));
    }

    #[test]
    fn mime_mismatch_is_advisory_only() {
        let request = ConversionRequest {
            source: png_bytes(10, 10),
            target: TargetFormat::Webp,
            request_id: "req-1".to_string(),
            declared_mime: Some("image/jpeg".to_string()),
        };
        // Declared JPEG, actually PNG - still converts
        let output = Converter::new().convert_request(&request).unwrap();
        assert_eq!(output.mime_type, "image/webp");
    }

    #[test]
    fn repeated_conversions_are_byte_identical() {
        let converter = Converter::new();
        let bytes = png_bytes(20, 20);
        let first = converter.convert(&bytes, TargetFormat::Png).unwrap();
        let second = converter.convert(&bytes, TargetFormat::Png).unwrap();
        assert_eq!(first.bytes, second.bytes);
    }
}
