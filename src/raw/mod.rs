/// RAW image decoding module
///
/// This module handles:
/// - Extracting embedded JPEG previews from RAW files
/// - Decoding sensor data when no preview is usable
/// - Generating cover-scaled thumbnails into the catalog's thumbnail folder

pub mod loader;
pub mod thumbnail;

pub use thumbnail::{cover_size, ThumbnailGenerator};
