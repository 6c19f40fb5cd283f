// src/engine/resize.rs
//
// Resize operations for icon renditions: contain-fit calculation and a
// SIMD-accelerated Lanczos3 resize with an image-crate fallback.

use crate::error::ConvertError;
use fast_image_resize::{self as fir, MulDiv, PixelType, ResizeOptions};
use image::{imageops, DynamicImage, RgbImage, RgbaImage};

type ResizeResult<T> = std::result::Result<T, ConvertError>;

/// Calculate contain-fit dimensions: scale to fit inside `box_w` x `box_h`
/// preserving aspect ratio, never cropping. Scaling up is allowed - a small
/// source fills the box the same way a large one shrinks into it.
pub fn calc_contain_dimensions(
    orig_w: u32,
    orig_h: u32,
    box_w: u32,
    box_h: u32,
) -> (u32, u32) {
    let orig_ratio = orig_w as f64 / orig_h as f64;
    let box_ratio = box_w as f64 / box_h as f64;

    let (w, h) = if orig_ratio > box_ratio {
        // Original image is wider → fit to width
        let ratio = box_w as f64 / orig_w as f64;
        (box_w, (orig_h as f64 * ratio).round() as u32)
    } else {
        // Original image is taller → fit to height
        let ratio = box_h as f64 / orig_h as f64;
        ((orig_w as f64 * ratio).round() as u32, box_h)
    };

    // Extreme aspect ratios can round a side down to zero
    (w.max(1), h.max(1))
}

fn default_resize_options() -> ResizeOptions {
    ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3))
}

/// Decide whether alpha premultiplication is required for a given pixel layout.
#[inline]
fn requires_premultiply(pixel_type: PixelType) -> bool {
    matches!(pixel_type, PixelType::U8x4)
}

/// High-quality resize via fast_image_resize (Lanczos3).
///
/// Works on a borrowed source because the icon packer renders several sizes
/// from the same decoded image. Falls back to the image crate's convolution
/// resize if fir rejects the buffer.
pub fn fast_resize(
    img: &DynamicImage,
    dst_width: u32,
    dst_height: u32,
) -> ResizeResult<DynamicImage> {
    let src_width = img.width();
    let src_height = img.height();

    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(ConvertError::resize_failed(
            (src_width, src_height),
            (dst_width, dst_height),
            "invalid dimensions for resize",
        ));
    }

    // Select pixel layout without forcing RGBA when not needed
    let (pixel_type, src_pixels): (PixelType, Vec<u8>) = match img {
        DynamicImage::ImageRgb8(rgb) => (PixelType::U8x3, rgb.as_raw().clone()),
        DynamicImage::ImageRgba8(rgba) => (PixelType::U8x4, rgba.as_raw().clone()),
        other => (PixelType::U8x4, other.to_rgba8().into_raw()),
    };

    match fir_resize(
        src_width, src_height, src_pixels.clone(), pixel_type, dst_width, dst_height,
    ) {
        Ok(resized) => Ok(resized),
        Err(reason) => {
            tracing::debug!(reason = %reason, "fir resize failed, using image crate fallback");
            image_crate_resize(&src_pixels, src_width, src_height, pixel_type, dst_width, dst_height)
                .map_err(|fallback_err| {
                    ConvertError::resize_failed(
                        (src_width, src_height),
                        (dst_width, dst_height),
                        format!("{reason}; image crate fallback failed: {fallback_err}"),
                    )
                })
        }
    }
}

fn fir_resize(
    src_width: u32,
    src_height: u32,
    src_pixels: Vec<u8>,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let mut src_image =
        fir::images::Image::from_vec_u8(src_width, src_height, src_pixels, pixel_type)
            .map_err(|e| format!("fir source image error: {e:?}"))?;
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, pixel_type);

    // Resampling straight RGBA bleeds color from fully transparent pixels;
    // premultiply around the resize for alpha layouts.
    let needs_premultiply = requires_premultiply(pixel_type);
    let mul_div = MulDiv::default();
    if needs_premultiply {
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
    }

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &default_resize_options())
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    if needs_premultiply {
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    }

    let dst_pixels = dst_image.into_vec();
    match pixel_type {
        PixelType::U8x3 => RgbImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| "failed to create rgb image from resized data".to_string()),
        PixelType::U8x4 => RgbaImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| "failed to create rgba image from resized data".to_string()),
        _ => Err("unsupported pixel type after resize".to_string()),
    }
}

fn image_crate_resize(
    src_pixels: &[u8],
    src_width: u32,
    src_height: u32,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let filter = imageops::FilterType::Lanczos3;
    match pixel_type {
        PixelType::U8x3 => {
            let rgb = RgbImage::from_raw(src_width, src_height, src_pixels.to_vec())
                .ok_or_else(|| "failed to build rgb image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageRgb8(imageops::resize(
                &rgb, dst_width, dst_height, filter,
            )))
        }
        PixelType::U8x4 => {
            let rgba = RgbaImage::from_raw(src_width, src_height, src_pixels.to_vec())
                .ok_or_else(|| "failed to build rgba image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageRgba8(imageops::resize(
                &rgba, dst_width, dst_height, filter,
            )))
        }
        _ => Err("fallback resize supports only U8x3/U8x4 pixel types".to_string()),
    }
}

/// Contain-fit the source into a transparent `size` x `size` RGBA canvas.
///
/// Non-square sources are letterboxed, never cropped; the padding is fully
/// transparent, so sources without an alpha channel get one synthesized here.
pub fn contain_into_square(img: &DynamicImage, size: u32) -> ResizeResult<RgbaImage> {
    if size == 0 {
        return Err(ConvertError::resize_failed(
            (img.width(), img.height()),
            (0, 0),
            "invalid canvas size",
        ));
    }

    let (fit_w, fit_h) = calc_contain_dimensions(img.width(), img.height(), size, size);
    let scaled = fast_resize(img, fit_w, fit_h)?.to_rgba8();

    if fit_w == size && fit_h == size {
        return Ok(scaled);
    }

    let mut canvas = RgbaImage::from_pixel(size, size, image::Rgba([0, 0, 0, 0]));
    let offset_x = i64::from((size - fit_w) / 2);
    let offset_y = i64::from((size - fit_h) / 2);
    imageops::overlay(&mut canvas, &scaled, offset_x, offset_y);
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, Rgba};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    mod contain_calc_tests {
        use super::*;

        #[test]
        fn square_into_square() {
            assert_eq!(calc_contain_dimensions(512, 512, 64, 64), (64, 64));
        }

        #[test]
        fn wide_image_fits_to_width() {
            // 200x100 into 64x64 → 64x32
            assert_eq!(calc_contain_dimensions(200, 100, 64, 64), (64, 32));
        }

        #[test]
        fn tall_image_fits_to_height() {
            // 100x200 into 64x64 → 32x64
            assert_eq!(calc_contain_dimensions(100, 200, 64, 64), (32, 64));
        }

        #[test]
        fn small_image_scales_up() {
            assert_eq!(calc_contain_dimensions(8, 8, 64, 64), (64, 64));
            assert_eq!(calc_contain_dimensions(8, 4, 64, 64), (64, 32));
        }

        #[test]
        fn extreme_ratio_never_collapses_to_zero() {
            let (w, h) = calc_contain_dimensions(10_000, 1, 16, 16);
            assert_eq!(w, 16);
            assert_eq!(h, 1);
        }
    }

    #[test]
    fn fast_resize_produces_requested_dimensions() {
        let img = create_test_image(100, 50);
        let resized = fast_resize(&img, 25, 10).unwrap();
        assert_eq!(resized.dimensions(), (25, 10));
    }

    #[test]
    fn fast_resize_rejects_zero_dimensions() {
        let img = create_test_image(4, 4);
        let err = fast_resize(&img, 0, 10).unwrap_err();
        assert!(matches!(err, ConvertError::ResizeFailed { .. }));
    }

    #[test]
    fn fast_resize_preserves_alpha_layout() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 128])));
        let resized = fast_resize(&img, 8, 8).unwrap();
        assert!(matches!(resized, DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn contain_square_letterboxes_wide_input() {
        let img = create_test_image(128, 64);
        let canvas = contain_into_square(&img, 64).unwrap();
        assert_eq!(canvas.dimensions(), (64, 64));

        // 64x32 content centered: rows 0..16 and 48..64 are transparent padding
        assert_eq!(canvas.get_pixel(32, 0).0[3], 0);
        assert_eq!(canvas.get_pixel(32, 63).0[3], 0);
        // Center rows carry content from the fully opaque source
        assert_eq!(canvas.get_pixel(32, 32).0[3], 255);
    }

    #[test]
    fn contain_square_synthesizes_alpha_for_opaque_sources() {
        let img = create_test_image(32, 32);
        assert!(!img.color().has_alpha());
        let canvas = contain_into_square(&img, 16).unwrap();
        // Square source fills the canvas; every pixel opaque but the buffer has alpha
        assert!(canvas.pixels().all(|p| p.0[3] == 255));
    }
}
