// src/engine/icon.rs
//
// Multi-resolution icon packing: square alpha-padded renditions at the
// standard sizes, each a lossless PNG, packed into one ICO container.
// Degrades to fewer sizes, then to a single fallback size, before giving up.

use crate::engine::encoder::encode_png;
use crate::engine::resize::contain_into_square;
use crate::error::ConvertError;
use image::DynamicImage;
use rayon::prelude::*;

/// Rendition sizes, largest first. Entry order in the container follows this
/// order, which is what icon consumers expect.
pub const ICON_SIZES: [u32; 6] = [256, 128, 64, 48, 32, 16];

/// Single-size fallback when the full set cannot be produced.
pub const FALLBACK_SIZE: u32 = 64;

/// One encoded rendition, collected in descending-size order while packing.
struct IconRendition {
    size: u32,
    png: Vec<u8>,
}

/// Render one square rendition: contain-fit onto a transparent canvas, then
/// lossless PNG. This is the default renderer; tests inject failing ones to
/// exercise the degradation path.
fn render_rendition(source: &DynamicImage, size: u32) -> Result<Vec<u8>, ConvertError> {
    let canvas = contain_into_square(source, size)?;
    encode_png(&DynamicImage::ImageRgba8(canvas))
}

/// Pack the source into a multi-resolution ICO container.
///
/// Two-stage degradation, modeled as explicit stages rather than nested
/// catch blocks:
/// 1. attempt the full size set, skipping (and logging) per-size failures;
/// 2. if that yields nothing, attempt a single rendition at `FALLBACK_SIZE`.
///
/// Only when both stages fail does the operation surface `IconPackFailed`.
pub fn pack_icon(source: &DynamicImage) -> Result<Vec<u8>, ConvertError> {
    pack_icon_with(source, render_rendition)
}

fn pack_icon_with<F>(source: &DynamicImage, render: F) -> Result<Vec<u8>, ConvertError>
where
    F: Fn(&DynamicImage, u32) -> Result<Vec<u8>, ConvertError> + Sync,
{
    match pack_size_set(source, &ICON_SIZES, &render) {
        Ok(container) => Ok(container),
        Err(err) => {
            tracing::warn!(
                error = %err,
                fallback_size = FALLBACK_SIZE,
                "full icon size set failed, attempting single-size fallback"
            );
            pack_size_set(source, &[FALLBACK_SIZE], &render).map_err(|fallback_err| {
                ConvertError::icon_pack_failed(format!(
                    "full size set failed ({err}); {FALLBACK_SIZE}px fallback failed ({fallback_err})"
                ))
            })
        }
    }
}

/// Attempt every size in `sizes`, accumulating the successful renditions.
/// A per-size failure is skipped, not fatal; an empty accumulator is.
fn pack_size_set<F>(
    source: &DynamicImage,
    sizes: &[u32],
    render: &F,
) -> Result<Vec<u8>, ConvertError>
where
    F: Fn(&DynamicImage, u32) -> Result<Vec<u8>, ConvertError> + Sync,
{
    // Order-preserving parallel map; sizes stay descending in the output.
    let renditions: Vec<IconRendition> = sizes
        .par_iter()
        .map(|&size| match render(source, size) {
            Ok(png) => Some(IconRendition { size, png }),
            Err(err) => {
                tracing::warn!(size, error = %err, "skipping icon size");
                None
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();

    if renditions.is_empty() {
        return Err(ConvertError::icon_pack_failed(
            "no rendition could be generated",
        ));
    }

    Ok(write_container(&renditions))
}

/// Serialize renditions into an ICO container.
///
/// Layout: ICONDIR (reserved=0, type=1, count) followed by one 16-byte
/// ICONDIRENTRY per rendition and the PNG payloads back to back. A size
/// byte of 0 means 256; entries are 32bpp RGBA.
fn write_container(renditions: &[IconRendition]) -> Vec<u8> {
    let payload_len: usize = renditions.iter().map(|r| r.png.len()).sum();
    let mut out = Vec::with_capacity(6 + 16 * renditions.len() + payload_len);

    out.extend_from_slice(&0u16.to_le_bytes()); // reserved
    out.extend_from_slice(&1u16.to_le_bytes()); // resource type: icon
    out.extend_from_slice(&(renditions.len() as u16).to_le_bytes());

    let mut data_offset = (6 + 16 * renditions.len()) as u32;
    for rendition in renditions {
        let side = if rendition.size >= 256 {
            0u8
        } else {
            rendition.size as u8
        };
        out.push(side); // width
        out.push(side); // height
        out.push(0); // palette colors (none)
        out.push(0); // reserved
        out.extend_from_slice(&0u16.to_le_bytes()); // color planes
        out.extend_from_slice(&32u16.to_le_bytes()); // bits per pixel
        out.extend_from_slice(&(rendition.png.len() as u32).to_le_bytes());
        out.extend_from_slice(&data_offset.to_le_bytes());
        data_offset += rendition.png.len() as u32;
    }

    for rendition in renditions {
        out.extend_from_slice(&rendition.png);
    }

    out
}
