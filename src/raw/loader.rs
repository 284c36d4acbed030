/// RAW file decoding
///
/// Turns a camera RAW file into an 8-bit RGB bitmap that can be resized.
/// Two strategies are tried in order:
/// 1. The largest decodable JPEG preview embedded in the file
/// 2. The sensor data itself, decoded with rawloader and demosaiced here
use image::{ImageFormat, Rgb, RgbImage};
use std::path::Path;

use crate::error::ThumbnailError;

/// JPEG Start Of Image followed by the first marker byte
const JPEG_START: &[u8] = b"\xff\xd8\xff";
/// JPEG End Of Image
const JPEG_END: &[u8] = b"\xff\xd9";

/// Display gamma applied to linear sensor values
const GAMMA: f32 = 1.0 / 2.2;

/// Where a decoded bitmap came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeSource {
    EmbeddedPreview,
    SensorData,
}

/// A RAW file decoded to RGB
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bitmap: RgbImage,
    pub source: DecodeSource,
}

impl LoadedImage {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }
}

/// Decode a RAW file into a full-resolution RGB bitmap
///
/// Fails with `ThumbnailError::Decode` when neither an embedded preview nor
/// the sensor data can be decoded, or when the result has a zero dimension.
pub fn load_raw_image(path: &Path) -> Result<LoadedImage, ThumbnailError> {
    let decode_error = |reason: String| ThumbnailError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let data = std::fs::read(path).map_err(|e| decode_error(format!("read failed: {}", e)))?;

    let loaded = match decode_largest_embedded_jpeg(&data) {
        Some(bitmap) => LoadedImage {
            bitmap,
            source: DecodeSource::EmbeddedPreview,
        },
        None => LoadedImage {
            bitmap: decode_sensor_data(path).map_err(decode_error)?,
            source: DecodeSource::SensorData,
        },
    };

    if loaded.width() == 0 || loaded.height() == 0 {
        return Err(decode_error("image has zero dimensions".to_string()));
    }

    tracing::debug!(
        path = %path.display(),
        width = loaded.width(),
        height = loaded.height(),
        source = ?loaded.source,
        "decoded RAW image"
    );

    Ok(loaded)
}

/// Find every embedded JPEG and return the largest one that decodes
fn decode_largest_embedded_jpeg(data: &[u8]) -> Option<RgbImage> {
    let mut candidates: Vec<&[u8]> = Vec::new();

    let mut pos = 0;
    while pos + JPEG_START.len() <= data.len() {
        if !data[pos..].starts_with(JPEG_START) {
            pos += 1;
            continue;
        }
        match data[pos..].windows(JPEG_END.len()).position(|w| w == JPEG_END) {
            Some(end_offset) => {
                let end = pos + end_offset + JPEG_END.len();
                candidates.push(&data[pos..end]);
                pos = end;
            }
            None => break,
        }
    }

    // Largest first; most RAW formats store the full-size preview last
    candidates.sort_by_key(|jpeg| std::cmp::Reverse(jpeg.len()));

    candidates.into_iter().find_map(|jpeg| {
        image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)
            .ok()
            .map(|img| img.to_rgb8())
            .filter(|img| img.width() > 0 && img.height() > 0)
    })
}

/// Decode the sensor data with rawloader and develop it to sRGB-ish RGB
fn decode_sensor_data(path: &Path) -> Result<RgbImage, String> {
    let decoder = rawloader::RawLoader::new();
    let raw_image = decoder
        .decode_file(path)
        .map_err(|e| format!("Failed to decode RAW: {:?}", e))?;

    develop(&raw_image)
}

/// Normalized as-shot white balance, green = 1.0
fn white_balance(raw_image: &rawloader::RawImage) -> [f32; 3] {
    let wb = raw_image.wb_coeffs;
    let valid = |v: f32| v.is_finite() && v > 0.0;

    if !(valid(wb[0]) && valid(wb[1]) && valid(wb[2])) {
        return [1.0, 1.0, 1.0];
    }

    [wb[0] / wb[1], 1.0, wb[2] / wb[1]]
}

/// Convert raw sensor values to an RGB bitmap of the same size
///
/// Bayer data is demosaiced per 2x2 block: the block's averaged R, G and B
/// values are written to all four of its pixels. Odd trailing rows and
/// columns are dropped.
fn develop(raw_image: &rawloader::RawImage) -> Result<RgbImage, String> {
    let width = raw_image.width;
    let height = raw_image.height;
    let cpp = raw_image.cpp;

    let values: Vec<f32> = match &raw_image.data {
        rawloader::RawImageData::Integer(values) => values.iter().map(|&v| v as f32).collect(),
        // Float data is already 0.0-1.0
        rawloader::RawImageData::Float(values) => values.iter().map(|&v| v * 65535.0).collect(),
    };

    if width == 0 || height == 0 || values.len() < width * height * cpp {
        return Err(format!(
            "sensor data too short for {}x{} ({} values)",
            width,
            height,
            values.len()
        ));
    }

    let wb = white_balance(raw_image);
    let normalize = |value: f32, channel: usize| -> f32 {
        let black = raw_image.blacklevels[channel] as f32;
        let white = (raw_image.whitelevels[channel] as f32).max(black + 1.0);
        ((value - black) / (white - black)).clamp(0.0, 1.0)
    };
    let to_u8 = |linear: f32| -> u8 { (linear.clamp(0.0, 1.0).powf(GAMMA) * 255.0).round() as u8 };

    if cpp == 3 {
        let bitmap = RgbImage::from_fn(width as u32, height as u32, |x, y| {
            let base = (y as usize * width + x as usize) * 3;
            let mut px = [0u8; 3];
            for (c, out) in px.iter_mut().enumerate() {
                *out = to_u8(normalize(values[base + c], c) * wb[c]);
            }
            Rgb(px)
        });
        return Ok(bitmap);
    }

    let out_width = (width & !1) as u32;
    let out_height = (height & !1) as u32;
    if out_width == 0 || out_height == 0 {
        return Err(format!("sensor too small to demosaic: {}x{}", width, height));
    }

    let mut bitmap = RgbImage::new(out_width, out_height);
    for by in (0..out_height as usize).step_by(2) {
        for bx in (0..out_width as usize).step_by(2) {
            let mut sums = [0.0f32; 3];
            let mut counts = [0u32; 3];

            for (dy, dx) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                let (row, col) = (by + dy, bx + dx);
                let value = values[row * width + col];
                // 0 = R, 1 = G, 2 = B, 3 = second green; anything else is monochrome
                let color = raw_image.cfa.color_at(row, col);
                let channel = match color {
                    0 | 1 | 2 => color,
                    3 => 1,
                    _ => {
                        let v = normalize(value, 0);
                        for c in 0..3 {
                            sums[c] += v;
                            counts[c] += 1;
                        }
                        continue;
                    }
                };
                sums[channel] += normalize(value, color.min(3));
                counts[channel] += 1;
            }

            let mut px = [0u8; 3];
            for c in 0..3 {
                let avg = if counts[c] > 0 { sums[c] / counts[c] as f32 } else { 0.0 };
                px[c] = to_u8(avg * wb[c]);
            }

            let px = Rgb(px);
            bitmap.put_pixel(bx as u32, by as u32, px);
            bitmap.put_pixel(bx as u32 + 1, by as u32, px);
            bitmap.put_pixel(bx as u32, by as u32 + 1, px);
            bitmap.put_pixel(bx as u32 + 1, by as u32 + 1, px);
        }
    }

    Ok(bitmap)
}
