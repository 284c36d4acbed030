use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::loader::load_raw_image;
use crate::error::ThumbnailError;
use crate::state::settings::ThumbnailSettings;

/// Resampling filter for thumbnails
const THUMBNAIL_FILTER: FilterType = FilterType::Lanczos3;

/// How many `<name>-N.jpg` alternatives to try before giving up
const MAX_NAME_SUFFIX: u32 = 10_000;

/// Compute the "cover" size of a source image for a target box
///
/// Both dimensions are scaled by the larger of `target/source` per axis, so
/// the result covers the box and overflows it on one axis. The axis whose
/// ratio wins lands exactly on the target; the other is floored.
/// Returns `None` when any dimension is zero.
pub fn cover_size(source: (u32, u32), target: (u32, u32)) -> Option<(u32, u32)> {
    let (sw, sh) = (source.0 as u64, source.1 as u64);
    let (tw, th) = (target.0 as u64, target.1 as u64);
    if sw == 0 || sh == 0 || tw == 0 || th == 0 {
        return None;
    }

    // tw/sw > th/sh  <=>  tw*sh > th*sw
    let (w, h) = if tw * sh > th * sw {
        (tw, sh * tw / sw)
    } else {
        (sw * th / sh, th)
    };

    Some((w.max(1) as u32, h.max(1) as u32))
}

/// Generates JPEG thumbnails for RAW files
#[derive(Debug, Clone, Default)]
pub struct ThumbnailGenerator {
    settings: ThumbnailSettings,
}

impl ThumbnailGenerator {
    pub fn new(settings: ThumbnailSettings) -> Self {
        Self { settings }
    }

    /// Generate a thumbnail for a RAW file
    ///
    /// The thumbnail is written to `destination_dir/<name>.jpg`, where name
    /// is the source's base name. If that file already exists a numeric
    /// suffix is added instead of overwriting it. Returns the written path.
    pub fn generate(&self, raw_path: &Path, destination_dir: &Path) -> Result<PathBuf, ThumbnailError> {
        let loaded = load_raw_image(raw_path)?;

        let target = (self.settings.width, self.settings.height);
        let (width, height) = cover_size((loaded.width(), loaded.height()), target).ok_or_else(|| {
            ThumbnailError::Decode {
                path: raw_path.to_path_buf(),
                reason: "image has zero dimensions".to_string(),
            }
        })?;

        let thumbnail = imageops::resize(&loaded.bitmap, width, height, THUMBNAIL_FILTER);

        fs::create_dir_all(destination_dir).map_err(|source| ThumbnailError::Write {
            path: destination_dir.to_path_buf(),
            source,
        })?;

        let base_name = raw_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "thumbnail".to_string());
        let (thumbnail_path, file) = create_unique(destination_dir, &base_name)?;

        let written = write_jpeg(file, &thumbnail, self.settings.jpeg_quality);
        if let Err(err) = written {
            // Never leave a partial thumbnail behind
            let _ = fs::remove_file(&thumbnail_path);
            return Err(match err {
                image::ImageError::IoError(source) => ThumbnailError::Write {
                    path: thumbnail_path,
                    source,
                },
                other => ThumbnailError::Encode {
                    path: thumbnail_path,
                    source: other,
                },
            });
        }

        tracing::debug!(
            source = %raw_path.display(),
            thumbnail = %thumbnail_path.display(),
            width,
            height,
            "generated thumbnail"
        );

        Ok(thumbnail_path)
    }
}

/// Exclusively create `<name>.jpg`, or `<name>-N.jpg` if taken
fn create_unique(dir: &Path, base_name: &str) -> Result<(PathBuf, File), ThumbnailError> {
    let mut candidate = dir.join(format!("{}.jpg", base_name));

    for suffix in 1..=MAX_NAME_SUFFIX {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                candidate = dir.join(format!("{}-{}.jpg", base_name, suffix));
            }
            Err(source) => return Err(ThumbnailError::Write { path: candidate, source }),
        }
    }

    Err(ThumbnailError::Write {
        path: candidate,
        source: io::Error::new(ErrorKind::AlreadyExists, "no free thumbnail name"),
    })
}

fn write_jpeg(file: File, thumbnail: &image::RgbImage, quality: u8) -> Result<(), image::ImageError> {
    let mut writer = BufWriter::with_capacity(64 * 1024, file);
    JpegEncoder::new_with_quality(&mut writer, quality).encode_image(thumbnail)?;
    writer.flush()?;
    Ok(())
}
