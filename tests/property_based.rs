// tests/property_based.rs
//
// Property tests for the geometry and validation invariants.

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use proptest::prelude::*;
use recast_image::engine::{calc_contain_dimensions, contain_into_square, validate, Limits};
use recast_image::{Converter, TargetFormat};
use std::io::Cursor;

fn create_test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    create_test_image(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_contain_dimensions_fit_the_box(
        orig_w in 1u32..=4096,
        orig_h in 1u32..=4096,
        side in 1u32..=256,
    ) {
        let (w, h) = calc_contain_dimensions(orig_w, orig_h, side, side);
        prop_assert!(w >= 1 && h >= 1);
        prop_assert!(w <= side);
        prop_assert!(h <= side);
        // One side always touches the box (contain scales up and down)
        prop_assert!(w == side || h == side);
    }

    #[test]
    fn prop_contain_preserves_aspect_ratio(
        orig_w in 1u32..=2048,
        orig_h in 1u32..=2048,
        side in 8u32..=256,
    ) {
        let (w, h) = calc_contain_dimensions(orig_w, orig_h, side, side);
        // Skip degenerate outputs where the 1px clamp dominates rounding
        prop_assume!(w > 1 && h > 1);
        let source_ratio = orig_w as f64 / orig_h as f64;
        let out_ratio = w as f64 / h as f64;
        // Rounding to integer pixels bounds the ratio drift
        let tolerance = 1.0 / (w.min(h) as f64 - 1.0).max(1.0);
        prop_assert!(
            (source_ratio.ln() - out_ratio.ln()).abs() <= tolerance,
            "ratio drifted: {source_ratio} vs {out_ratio}"
        );
    }

    #[test]
    fn prop_square_canvas_is_always_square_rgba(
        orig_w in 1u32..=64,
        orig_h in 1u32..=64,
        side in 1u32..=64,
    ) {
        let img = create_test_image(orig_w, orig_h);
        let canvas = contain_into_square(&img, side).unwrap();
        prop_assert_eq!(canvas.dimensions(), (side, side));
    }

    #[test]
    fn prop_validate_accepts_within_and_rejects_above_the_ceiling(
        w in 1u32..=48,
        h in 1u32..=48,
        ceiling in 8u32..=48,
    ) {
        let limits = Limits {
            max_dimension: ceiling,
            ..Limits::default()
        };
        let bytes = png_bytes(w, h);
        let result = validate(&bytes, &limits);
        if w <= ceiling && h <= ceiling {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.is_err());
        }
    }
}

proptest! {
    // Full pipeline cases are heavier; keep the count low
    #![proptest_config(ProptestConfig {
        cases: 12,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_png_round_trip_preserves_dimensions(
        w in 1u32..=32,
        h in 1u32..=32,
    ) {
        let output = Converter::new()
            .convert(&png_bytes(w, h), TargetFormat::Png)
            .unwrap();
        let decoded = image::load_from_memory(&output.bytes).unwrap();
        prop_assert_eq!(decoded.dimensions(), (w, h));
    }
}
