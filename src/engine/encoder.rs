// src/engine/encoder.rs
//
// Encoder operations: JPEG (mozjpeg), PNG (+oxipng), WebP, GIF, AVIF with
// per-format policy settings, plus the dispatch that routes the ico target
// to the icon packer.

use crate::engine::common::run_with_panic_policy;
use crate::engine::icon;
use crate::engine::validator::SourceImage;
use crate::engine::MAX_DIMENSION;
use crate::error::ConvertError;
use crate::policy::TargetFormat;
use image::codecs::avif::AvifEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use std::io::Cursor;

type EncoderResult<T> = std::result::Result<T, ConvertError>;

/// 品質値(0-100)から各フォーマットのエンコード設定を導出するための
/// センターオブトゥルース。品質帯域は以下で固定する:
/// - High (>=85): 視覚品質重視、AVIF speed 6
/// - Balanced (70-84): 画質と速度のバランス、AVIF speed 7
/// - Fast (50-69): 速度寄り、AVIF speed 8
/// - Fastest (<50): 最速優先、AVIF speed 9
#[derive(Debug, Clone, Copy)]
pub struct QualitySettings {
    quality: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualityBand {
    High,
    Balanced,
    Fast,
    Fastest,
}

impl QualitySettings {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.min(100) as f32,
        }
    }

    fn band(&self) -> QualityBand {
        if self.quality >= 85.0 {
            QualityBand::High
        } else if self.quality >= 70.0 {
            QualityBand::Balanced
        } else if self.quality >= 50.0 {
            QualityBand::Fast
        } else {
            QualityBand::Fastest
        }
    }

    // WebP settings - method 4 / single pass is the speed/quality sweet spot
    // for one-shot conversions.
    pub fn webp_method(&self) -> i32 {
        4
    }

    pub fn webp_pass(&self) -> i32 {
        1
    }

    pub fn webp_sns_strength(&self) -> i32 {
        match self.band() {
            QualityBand::High => 50,
            QualityBand::Balanced => 70,
            QualityBand::Fast | QualityBand::Fastest => 80,
        }
    }

    pub fn webp_filter_strength(&self) -> i32 {
        if self.quality >= 80.0 {
            20
        } else if self.quality >= 60.0 {
            30
        } else {
            40
        }
    }

    pub fn webp_filter_sharpness(&self) -> i32 {
        match self.band() {
            QualityBand::High => 2,
            QualityBand::Balanced | QualityBand::Fast | QualityBand::Fastest => 0,
        }
    }

    // AVIF settings for the rav1e encoder
    // speed: 1 (slowest/best) to 10 (fastest/worst)
    pub fn avif_speed(&self) -> u8 {
        match self.band() {
            QualityBand::High => 6,
            QualityBand::Balanced => 7,
            QualityBand::Fast => 8,
            QualityBand::Fastest => 9,
        }
    }
}

/// Encode to JPEG using mozjpeg with Web-optimized settings
/// (progressive, optimized scans, 4:2:0 chroma subsampling).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:jpeg", || {
        use std::borrow::Cow;
        let quality = quality.min(100);

        // Zero-copy optimization: avoid conversion if already RGB8
        let rgb: Cow<'_, image::RgbImage> = match img {
            DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
            _ => Cow::Owned(img.to_rgb8()),
        };
        let (w, h) = rgb.dimensions();
        let pixels: &[u8] = rgb.as_raw();

        // Pre-validation keeps panic paths out of the C encoder
        if w == 0 || h == 0 {
            return Err(ConvertError::internal_panic(
                "Invalid image dimensions: width or height is zero",
            ));
        }

        if w > MAX_DIMENSION || h > MAX_DIMENSION {
            return Err(ConvertError::dimension_exceeds_limit(
                w.max(h),
                MAX_DIMENSION,
            ));
        }

        let expected_len = (w as usize) * (h as usize) * 3;
        if pixels.len() != expected_len {
            return Err(ConvertError::corrupted_image());
        }

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(w as usize, h as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(quality as f32);

        comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);
        comp.set_optimize_scans(true);
        comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);

        let estimated_size = (w as usize * h as usize * 3 / 10).max(4096);
        let mut output = Vec::with_capacity(estimated_size);

        let mut writer = comp.start_compress(&mut output).map_err(|e| {
            ConvertError::encode_failed(
                "jpeg",
                format!("mozjpeg: failed to start compress: {e:?}"),
            )
        })?;

        let stride = w as usize * 3;
        for row in pixels.chunks(stride) {
            writer.write_scanlines(row).map_err(|e| {
                ConvertError::encode_failed(
                    "jpeg",
                    format!("mozjpeg: failed to write scanlines: {e:?}"),
                )
            })?;
        }

        writer.finish().map_err(|e| {
            ConvertError::encode_failed("jpeg", format!("mozjpeg: failed to finish: {e:?}"))
        })?;

        Ok(output)
    })
}

/// Encode to PNG: image crate at maximum compression, then oxipng
/// recompression. Lossless end to end - quality settings do not apply.
pub fn encode_png(img: &DynamicImage) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let mut buf = Vec::new();
        let encoder = PngEncoder::new_with_quality(
            Cursor::new(&mut buf),
            CompressionType::Best,
            FilterType::Adaptive,
        );
        img.write_with_encoder(encoder)
            .map_err(|e| ConvertError::encode_failed("png", format!("PNG encode failed: {e}")))?;

        // oxipng で再圧縮してサイズを最適化（無劣化）
        let mut options = oxipng::Options::from_preset(4);
        options.strip = oxipng::StripChunks::Safe;
        // Color-type reductions would turn an opaque RGBA image into RGB;
        // alpha presence must survive the round trip, so keep the layout.
        options.color_type_reduction = false;
        options.grayscale_reduction = false;

        oxipng::optimize_from_memory(&buf, &options).map_err(|e| {
            ConvertError::encode_failed("png", format!("oxipng optimization failed: {e}"))
        })
    })
}

/// Encode to WebP with optimized settings. Keeps the alpha channel only when
/// the source actually has one, to reduce file size.
pub fn encode_webp(img: &DynamicImage, quality: u8) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:webp", || {
        let has_alpha = img.color().has_alpha();

        // Hold the converted buffer for the encoder's borrow
        let rgba;
        let rgb;
        let encoder = if has_alpha {
            rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            webp::Encoder::from_rgba(&rgba, w, h)
        } else {
            rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            webp::Encoder::from_rgb(&rgb, w, h)
        };

        let mut config = webp::WebPConfig::new()
            .map_err(|_| ConvertError::internal_panic("failed to create WebPConfig"))?;

        let settings = QualitySettings::new(quality);
        config.quality = quality.min(100) as f32;
        config.method = settings.webp_method();
        config.pass = settings.webp_pass();
        config.sns_strength = settings.webp_sns_strength();
        config.autofilter = 1;
        config.filter_strength = settings.webp_filter_strength();
        config.filter_sharpness = settings.webp_filter_sharpness();

        let mem = encoder.encode_advanced(&config).map_err(|e| {
            ConvertError::encode_failed("webp", format!("WebP encode failed: {e:?}"))
        })?;

        Ok(mem.to_vec())
    })
}

/// Encode to GIF via the image crate (palette-quantized, single frame).
pub fn encode_gif(img: &DynamicImage) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:gif", || {
        let mut buf = Vec::new();
        // The gif encoder wants RGB8/RGBA8 frames
        let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
        rgba.write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)
            .map_err(|e| ConvertError::encode_failed("gif", format!("GIF encode failed: {e}")))?;
        Ok(buf)
    })
}

/// Encode to AVIF via the image crate's rav1e-backed encoder.
/// Speed is derived from the quality band.
pub fn encode_avif(img: &DynamicImage, quality: u8) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:avif", || {
        let quality = quality.clamp(1, 100);
        let settings = QualitySettings::new(quality);

        // AvifEncoder accepts RGB8/RGBA8 input only
        let converted = if img.color().has_alpha() {
            DynamicImage::ImageRgba8(img.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(img.to_rgb8())
        };

        let mut buf = Vec::new();
        let encoder =
            AvifEncoder::new_with_speed_quality(Cursor::new(&mut buf), settings.avif_speed(), quality);
        converted
            .write_with_encoder(encoder)
            .map_err(|e| ConvertError::encode_failed("avif", format!("AVIF encode failed: {e}")))?;
        Ok(buf)
    })
}

/// Encode a validated source to the requested target.
///
/// Looks up the format policy, routes the icon target to the packer, and
/// guarantees the all-or-nothing output contract: either a complete buffer
/// comes back or an error does - never an empty or truncated one.
pub fn encode_output(
    source: &SourceImage,
    target: TargetFormat,
) -> EncoderResult<(Vec<u8>, &'static str)> {
    let policy = target.policy();

    let bytes = match target {
        TargetFormat::Jpeg => encode_jpeg(source.image(), policy.quality.unwrap_or(90))?,
        TargetFormat::Png => encode_png(source.image())?,
        TargetFormat::Webp => encode_webp(source.image(), policy.quality.unwrap_or(85))?,
        TargetFormat::Gif => encode_gif(source.image())?,
        TargetFormat::Avif => encode_avif(source.image(), policy.quality.unwrap_or(80))?,
        TargetFormat::Ico => icon::pack_icon(source.image())?,
    };

    if bytes.is_empty() {
        return Err(ConvertError::encode_failed(
            target.as_str(),
            "codec returned zero bytes",
        ));
    }

    Ok((bytes, policy.mime_type))
}
