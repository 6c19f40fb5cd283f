// src/engine/decoder.rs
//
// Decoder operations: JPEG (mozjpeg), PNG (zune-png), WebP (libwebp),
// everything else via the image crate.

use crate::engine::common::run_with_panic_policy;
use crate::engine::MAX_DIMENSION;
use crate::error::ConvertError;
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage,
};
use mozjpeg::Decompress;
use std::io::Cursor;
use webp::{BitstreamFeatures, Decoder as WebPDecoder};
use zune_core::bytestream::ZCursor;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

type DecoderResult<T> = std::result::Result<T, ConvertError>;

/// Detect input format using magic bytes. Returns None if unknown.
/// The declared MIME from the upload is advisory only and never consulted.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Read dimensions from the container header WITHOUT decoding pixels.
/// Returns None when the header cannot be parsed; the full decode will
/// produce the real error in that case.
pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    reader.into_dimensions().ok()
}

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo).
/// This is significantly faster than the image crate's pure Rust decoder.
pub fn decode_jpeg_mozjpeg(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:mozjpeg", || {
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(ConvertError::decode_failed(
                "mozjpeg: missing JPEG EOI marker",
            ));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            ConvertError::decode_failed(format!("mozjpeg decompress init failed: {e:?}"))
        })?;

        let mut decompress = decompress.rgb().map_err(|e| {
            ConvertError::decode_failed(format!("mozjpeg rgb conversion failed: {e:?}"))
        })?;

        let width = decompress.width();
        let height = decompress.height();
        if width > MAX_DIMENSION as usize || height > MAX_DIMENSION as usize {
            return Err(ConvertError::dimension_exceeds_limit(
                width.max(height) as u32,
                MAX_DIMENSION,
            ));
        }
        let width = width as u32;
        let height = height as u32;

        let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
            ConvertError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
        })?;

        let flat_pixels: Vec<u8> = pixels.into_iter().flatten().collect();
        let rgb_image = RgbImage::from_raw(width, height, flat_pixels).ok_or_else(|| {
            ConvertError::decode_failed("mozjpeg: failed to create image from raw data")
        })?;

        Ok(DynamicImage::ImageRgb8(rgb_image))
    })
}

/// Decode PNG using zune-png (SIMD最適化デコーダ)。16bit入力は8bitへダウンサンプル。
pub fn decode_png_zune(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:png", || {
        let options = DecoderOptions::default().png_set_strip_to_8bit(true);
        let mut decoder = PngDecoder::new_with_options(ZCursor::new(data), options);
        let pixels = decoder
            .decode()
            .map_err(|e| ConvertError::decode_failed(format!("png: decode failed: {e}")))?;

        let info = decoder
            .info()
            .ok_or_else(|| ConvertError::decode_failed("png: missing header info"))?;

        let width = info.width as u32;
        let height = info.height as u32;
        check_hard_ceiling(width, height)?;

        let buf = match pixels {
            zune_core::result::DecodingResult::U8(v) => v,
            _ => {
                return Err(ConvertError::decode_failed(
                    "png: unexpected non-U8 pixel buffer",
                ))
            }
        };

        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| ConvertError::decode_failed("png: missing colorspace"))?;

        let img = match colorspace {
            ColorSpace::RGB => RgbImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| ConvertError::decode_failed("png: failed to build RGB image"))?,
            ColorSpace::RGBA | ColorSpace::YCbCr | ColorSpace::BGRA | ColorSpace::ARGB => {
                RgbaImage::from_raw(width, height, buf)
                    .map(DynamicImage::ImageRgba8)
                    .ok_or_else(|| {
                        ConvertError::decode_failed("png: failed to build RGBA image")
                    })?
            }
            ColorSpace::Luma => GrayImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| ConvertError::decode_failed("png: failed to build Luma image"))?,
            ColorSpace::LumaA => GrayAlphaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLumaA8)
                .ok_or_else(|| ConvertError::decode_failed("png: failed to build LumaA image"))?,
            other => {
                return Err(ConvertError::decode_failed(format!(
                    "png: unsupported colorspace {:?}",
                    other
                )))
            }
        };

        Ok(img)
    })
}

/// Decode WebP using libwebp (via webp crate). Falls back to the image crate
/// for animated WebP, taking the first frame.
pub fn decode_webp_libwebp(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:webp", || {
        // Parse header first to avoid allocating huge buffers on malformed files
        let features = BitstreamFeatures::new(data)
            .ok_or_else(|| ConvertError::decode_failed("webp: failed to read bitstream features"))?;

        if features.has_animation() {
            // libwebp simple decoder does not support animation
            return image::load_from_memory(data).map_err(|e| {
                ConvertError::decode_failed(format!("webp (animated) decode failed: {e}"))
            });
        }

        check_hard_ceiling(features.width(), features.height())?;

        let decoder = WebPDecoder::new(data);
        let decoded = decoder
            .decode()
            .ok_or_else(|| ConvertError::decode_failed("webp: decode failed"))?;

        Ok(decoded.to_image())
    })
}

/// Decode remaining formats (gif, bmp, ico, ...) using the image crate.
pub fn decode_with_image_crate(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:image", || {
        image::load_from_memory(data)
            .map_err(|e| ConvertError::decode_failed(format!("decode failed: {e}")))
    })
}

/// Unified decode entrypoint:
/// - Detect format once (magic bytes)
/// - Route JPEG to mozjpeg, PNG to zune-png, WebP to libwebp, others to the
///   image crate
/// - Return decoded image and detected format
pub fn decode_image(bytes: &[u8]) -> DecoderResult<(DynamicImage, Option<ImageFormat>)> {
    let detected = detect_format(bytes);
    let img = match detected {
        Some(ImageFormat::Jpeg) => decode_jpeg_mozjpeg(bytes)?,
        Some(ImageFormat::Png) => decode_png_zune(bytes)?,
        Some(ImageFormat::WebP) => decode_webp_libwebp(bytes)?,
        _ => decode_with_image_crate(bytes)?,
    };
    Ok((img, detected))
}

/// Absolute ceiling independent of the configurable `Limits`; the validator
/// applies the configured ceiling on top of this.
fn check_hard_ceiling(width: u32, height: u32) -> DecoderResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ConvertError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    Ok(())
}
