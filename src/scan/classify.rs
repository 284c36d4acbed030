/// Extension-based media classification
///
/// Classification is a pure function of the lowercased file extension.
/// No file contents are read.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Supported RAW file extensions (common formats)
pub const RAW_EXTENSIONS: &[&str] = &[
    "nef", "dng", "cr2", "cr3", "arw", "raf", "orf", "rw2",
    "pef", "srw", "erf", "kdc", "dcr", "mos", "raw", "rwl",
];

pub const HEIC_EXTENSIONS: &[&str] = &["heic", "heif"];
pub const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];
pub const PNG_EXTENSIONS: &[&str] = &["png"];
pub const GIF_EXTENSIONS: &[&str] = &["gif"];
pub const BMP_EXTENSIONS: &[&str] = &["bmp"];
pub const WEBP_EXTENSIONS: &[&str] = &["webp"];

/// Extensions filtered as videos. GIF is listed here, not under photos.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "gif"];

/// Media kind of a cataloged file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MediaKind {
    RawPhoto,
    Heic,
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
    Other,
}

impl MediaKind {
    pub const ALL: [MediaKind; 8] = [
        MediaKind::RawPhoto,
        MediaKind::Heic,
        MediaKind::Jpeg,
        MediaKind::Png,
        MediaKind::Gif,
        MediaKind::Bmp,
        MediaKind::Webp,
        MediaKind::Other,
    ];

    /// Kind for an already-lowercased extension
    pub fn from_extension(ext: &str) -> Self {
        if RAW_EXTENSIONS.contains(&ext) {
            MediaKind::RawPhoto
        } else if HEIC_EXTENSIONS.contains(&ext) {
            MediaKind::Heic
        } else if JPEG_EXTENSIONS.contains(&ext) {
            MediaKind::Jpeg
        } else if PNG_EXTENSIONS.contains(&ext) {
            MediaKind::Png
        } else if GIF_EXTENSIONS.contains(&ext) {
            MediaKind::Gif
        } else if BMP_EXTENSIONS.contains(&ext) {
            MediaKind::Bmp
        } else if WEBP_EXTENSIONS.contains(&ext) {
            MediaKind::Webp
        } else {
            MediaKind::Other
        }
    }

    pub fn is_raw(self) -> bool {
        self == MediaKind::RawPhoto
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MediaKind::RawPhoto => "RAW",
            MediaKind::Heic => "HEIC",
            MediaKind::Jpeg => "JPEG",
            MediaKind::Png => "PNG",
            MediaKind::Gif => "GIF",
            MediaKind::Bmp => "BMP",
            MediaKind::Webp => "WEBP",
            MediaKind::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Coarse grouping used to filter the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileExtensionGroup {
    #[default]
    All,
    Photos,
    Videos,
    Others,
}

impl FileExtensionGroup {
    /// Group of an already-lowercased extension. Never returns `All`.
    pub fn from_extension(ext: &str) -> Self {
        if VIDEO_EXTENSIONS.contains(&ext) {
            FileExtensionGroup::Videos
        } else if photo_extensions().any(|photo| photo == ext) {
            FileExtensionGroup::Photos
        } else {
            FileExtensionGroup::Others
        }
    }

    /// Whether an entry with this extension belongs to the group
    pub fn contains(self, ext: &str) -> bool {
        self == FileExtensionGroup::All || Self::from_extension(ext) == self
    }
}

/// Every extension filtered as a photo
pub fn photo_extensions() -> impl Iterator<Item = &'static str> {
    [
        RAW_EXTENSIONS,
        HEIC_EXTENSIONS,
        JPEG_EXTENSIONS,
        PNG_EXTENSIONS,
        BMP_EXTENSIONS,
        WEBP_EXTENSIONS,
    ]
    .into_iter()
    .flatten()
    .copied()
}

/// Lowercased extension of a path, or an empty string
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Classify a path by its extension
pub fn classify(path: &Path) -> (MediaKind, FileExtensionGroup) {
    let ext = extension_of(path);
    (MediaKind::from_extension(&ext), FileExtensionGroup::from_extension(&ext))
}
