// tests/edge_cases.rs
//
// Edge cases at the request boundary: corrupt input, limit violations,
// odd dimensions, non-square icon sources.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use recast_image::{ConvertError, Converter, Limits, TargetFormat};
use std::io::Cursor;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img: RgbImage = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn empty_input_fails_with_decode_error() {
    let err = Converter::new().convert(&[], TargetFormat::Png).unwrap_err();
    assert!(matches!(err, ConvertError::DecodeFailed { .. }));
}

#[test]
fn garbage_input_fails_with_decode_error() {
    let err = Converter::new()
        .convert(b"this is not an image at all", TargetFormat::Jpeg)
        .unwrap_err();
    assert!(matches!(err, ConvertError::DecodeFailed { .. }));
    assert!(err.payload().suggestion.is_some());
}

#[test]
fn truncated_png_fails_with_decode_error() {
    let bytes = png_bytes(64, 64);
    let truncated = &bytes[..bytes.len() / 3];
    let err = Converter::new()
        .convert(truncated, TargetFormat::Webp)
        .unwrap_err();
    assert!(matches!(err, ConvertError::DecodeFailed { .. }));
}

#[test]
fn unknown_target_token_is_rejected_before_validation() {
    let err = TargetFormat::from_token("heic").unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    // Boundary rejection: garbage source is irrelevant because the token
    // never parses into a target the converter would accept.
}

#[test]
fn oversized_bytes_fail_without_touching_the_decoder() {
    let limits = Limits {
        max_bytes: 100,
        ..Limits::default()
    };
    // A valid PNG over the byte ceiling still fails with SourceTooLarge,
    // proving the byte gate runs first.
    let bytes = png_bytes(64, 64);
    assert!(bytes.len() > 100);
    let err = Converter::with_limits(limits)
        .convert(&bytes, TargetFormat::Png)
        .unwrap_err();
    assert!(matches!(err, ConvertError::SourceTooLarge { .. }));
}

#[test]
fn oversized_dimensions_fail_for_every_target() {
    let limits = Limits {
        max_dimension: 20,
        ..Limits::default()
    };
    let converter = Converter::with_limits(limits);
    let bytes = png_bytes(21, 10);
    for target in [TargetFormat::Jpeg, TargetFormat::Ico] {
        let err = converter.convert(&bytes, target).unwrap_err();
        assert!(
            matches!(err, ConvertError::DimensionExceedsLimit { .. }),
            "{target:?}"
        );
    }
}

#[test]
fn one_pixel_image_converts_everywhere() {
    let converter = Converter::new();
    let bytes = png_bytes(1, 1);
    for target in [
        TargetFormat::Jpeg,
        TargetFormat::Png,
        TargetFormat::Webp,
        TargetFormat::Gif,
        TargetFormat::Ico,
    ] {
        let output = converter.convert(&bytes, target).unwrap();
        assert!(!output.bytes.is_empty(), "{target:?} returned empty output");
    }
}

#[test]
fn extreme_aspect_ratio_survives_icon_packing() {
    // 300x3 letterboxes into every rendition without collapsing to zero
    let output = Converter::new()
        .convert(&png_bytes(300, 3), TargetFormat::Ico)
        .unwrap();
    let count = u16::from_le_bytes([output.bytes[4], output.bytes[5]]);
    assert_eq!(count, 6);
}

#[test]
fn non_square_icon_source_keeps_full_content() {
    let output = Converter::new()
        .convert(&png_bytes(128, 32), TargetFormat::Ico)
        .unwrap();
    let bytes = &output.bytes;

    // Find the 64px entry (third one) and decode it
    let entry = &bytes[6 + 16 * 2..6 + 16 * 3];
    assert_eq!(entry[0], 64);
    let size = u32::from_le_bytes([entry[8], entry[9], entry[10], entry[11]]) as usize;
    let offset = u32::from_le_bytes([entry[12], entry[13], entry[14], entry[15]]) as usize;
    let rendition = image::load_from_memory(&bytes[offset..offset + size])
        .unwrap()
        .to_rgba8();
    assert_eq!(rendition.dimensions().0, 64);

    // Content is 64x16 centered vertically. The opaque content bounding box
    // must span the full width (letterboxed, not cropped).
    let opaque_rows: Vec<u32> = (0..64)
        .filter(|&y| (0..64).any(|x| rendition.get_pixel(x, y).0[3] > 0))
        .collect();
    assert!(!opaque_rows.is_empty());
    assert!(opaque_rows.len() < 64, "expected transparent letterbox rows");
    for &y in &opaque_rows {
        assert!(rendition.get_pixel(0, y).0[3] > 0, "left edge cropped");
        assert!(rendition.get_pixel(63, y).0[3] > 0, "right edge cropped");
    }
}

#[test]
fn strict_limits_reject_what_lenient_accepts() {
    // 5001 wide is in bounds for lenient, out of bounds for strict. Use a
    // thin strip so the test image stays cheap.
    let bytes = png_bytes(5001, 2);
    assert!(Converter::with_limits(Limits::lenient())
        .convert(&bytes, TargetFormat::Png)
        .is_ok());
    let err = Converter::with_limits(Limits::strict())
        .convert(&bytes, TargetFormat::Png)
        .unwrap_err();
    assert!(matches!(err, ConvertError::DimensionExceedsLimit { .. }));
}

#[test]
fn error_payload_shape_is_stable() {
    let err = Converter::new()
        .convert(b"nonsense", TargetFormat::Png)
        .unwrap_err();
    let payload = err.payload();
    assert!(!payload.error.is_empty());
    // Decode failures carry a retry hint for the shell to surface
    assert!(payload.suggestion.is_some());
}
